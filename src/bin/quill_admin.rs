//!
//! quill admin binary
//! ------------------
//! Operator tool for granting the superuser flag to an account, working
//! directly against the store files. When the email has no account yet, one
//! is created with a generated password that is printed exactly once.

use std::env;

use anyhow::Result;

use quill::security;
use quill::storage::SharedStore;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <email> [--root <db_root>]\n\nGrants the superuser flag to the account with the given email.\nCreates the account first when it does not exist.\n\nDefaults:\n  --root defaults to dbs, or the QUILL_DB_FOLDER environment variable."
    );
}

fn parse_root(args: &[String]) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--root"
            && i + 1 < args.len() {
                return Some(args[i + 1].clone());
            }
        i += 1;
    }
    None
}

fn generated_password() -> String {
    let mut buf = [0u8; 12];
    let _ = getrandom::getrandom(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("quill_admin").to_string();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--root" {
            // Skip the flag and its value.
            i += 2;
            continue;
        }
        if args[i].starts_with("--") {
            i += 1;
            continue;
        }
        positional.push(args[i].clone());
        i += 1;
    }
    let Some(email) = positional.first() else {
        print_usage(&program);
        std::process::exit(1);
    };
    let email = email.trim().to_lowercase();

    let root = parse_root(&args)
        .or_else(|| env::var("QUILL_DB_FOLDER").ok())
        .unwrap_or_else(|| "dbs".to_string());

    let store = SharedStore::new(&root)?;
    let guard = store.0.lock();

    if guard.find_user_by_email(&email)?.is_none() {
        let username = email.split('@').next().unwrap_or(email.as_str()).to_string();
        let password = generated_password();
        let phc = security::hash_password(&password)?;
        guard.create_user(&username, &email, &phc)?;
        println!("No user found with email {email}; created account '{username}' with password: {password}");
    }

    let user = guard.grant_superuser(&email)?;
    println!("{} is now a superuser (id {})", user.email, user.id);
    Ok(())
}
