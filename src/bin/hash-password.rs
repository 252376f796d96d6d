//! Print a bcrypt hash suitable for `ADMIN_HASH_PASSWORD`.

use bcrypt::{hash, DEFAULT_COST};
use std::env;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD> [COST]");
        std::process::exit(1);
    });
    let cost = match env::args().nth(2) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("COST must be an integer between 4 and 31");
            std::process::exit(1);
        }),
        None => DEFAULT_COST,
    };

    if password.chars().count() < 8 {
        eprintln!("Password must be at least 8 characters long");
        std::process::exit(1);
    }

    match hash(&password, cost) {
        Ok(hashed) => {
            println!("\nCost     : {}", cost);
            println!("Hash     : {}\n", hashed);
            println!("# Paste this into your .env together with ADMIN_USERNAME:");
            println!("ADMIN_HASH_PASSWORD={}", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
