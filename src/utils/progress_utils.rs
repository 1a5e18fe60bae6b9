use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Styled progress bar for bulk operations. Returns `None` when stderr is
/// not a terminal so CI and service logs stay clean.
pub fn progress_bar(len: u64, message: String) -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }

    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise} / {eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .ok()?
        .progress_chars("##-");

    let bar = ProgressBar::new(len);
    bar.set_style(style);
    bar.set_message(message);

    Some(bar)
}
