fn main() -> anyhow::Result<()> {
    let result = rlterm::keys::run();

    // Leave the terminal in a usable state before any error is printed
    use std::io::{self, Write};
    let _ = io::stderr().flush();
    let _ = io::stdout().flush();

    result
}
