pub mod input;
pub mod recorder;
pub mod screen;

pub use input::{decode_chunks, input_strategy, joined_text};
pub use recorder::{Action, CsiRecorder};
pub use screen::ScreenProbe;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    EnvFilter::new("rlterm_terminal=debug,rlterm_test_utils=debug")
                }),
            )
            .with_test_writer()
            .init();
    });
}
