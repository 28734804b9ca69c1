//! `portico hash-password`: Digest for a Basic auth user entry.

pub fn run(password: &str) {
    println!("{}", portico_security::password_digest(password));
}
