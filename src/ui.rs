/// User interface and status output utilities
///
/// This module handles:
/// - Serialized console output
/// - Colored terminal text
/// - Status and notification messages
/// - Yes/no confirmation prompts
use lazy_static::lazy_static;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

/// Execute a function with exclusive access to console output
fn status_lock<F>(f: F)
where
    F: FnOnce(),
{
    lazy_static! {
        static ref LOCK: Mutex<()> = Mutex::new(());
    }
    let _guard = LOCK.lock();
    f();
}

/// Print colored text to terminal, with fallback to plain text
fn print_color(s: &str, fg: term::color::Color) {
    if !really_print_color(s, fg) {
        print!("{}", s);
    }

    fn really_print_color(s: &str, fg: term::color::Color) -> bool {
        if let Some(ref mut t) = term::stdout() {
            if t.fg(fg).is_err() {
                return false;
            }
            let _ = t.attr(term::Attr::Bold);
            if write!(t, "{}", s).is_err() {
                return false;
            }
            let _ = t.reset();
            return true;
        }

        false
    }
}

/// Print a status message with the "relatorios: " prefix
pub fn status(s: &str) {
    status_lock(|| {
        print!("relatorios: ");
        println!("{}", s);
    });
}

/// Print a dismissible notification (fetch/persistence failures)
pub fn print_notice(msg: &str) {
    status_lock(|| {
        print_color("aviso", term::color::BRIGHT_YELLOW);
        println!(": {}", msg);
    });
}

/// Print an error message with colored "erro" prefix
pub fn print_error(msg: &str) {
    println!();
    print_color("erro", term::color::BRIGHT_RED);
    println!(": {}", msg);
    println!();
}

/// Ask a yes/no question on stdin. Anything but "s"/"sim"/"y"/"yes" is no.
pub fn confirm(prompt: &str) -> bool {
    let stdin = io::stdin();
    confirm_from(&mut stdin.lock(), prompt)
}

/// [`confirm`] reading the answer from any buffered reader
pub fn confirm_from<R: BufRead>(input: &mut R, prompt: &str) -> bool {
    status_lock(|| {
        print!("{} [s/N] ", prompt);
        let _ = io::stdout().flush();
    });

    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    is_affirmative(&answer)
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "s" | "sim" | "y" | "yes")
}
