//! Progress bar construction shared by training and batch encoding.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle, style::TemplateError};

/// Creates a progress bar of `size` steps labelled with `msg`.
///
/// When `visible` is false the bar still counts but never renders.
///
/// # Errors
///
/// Returns a [`TemplateError`] if the progress bar style template is invalid.
pub(crate) fn progress_bar(
    size: u64,
    msg: impl Into<String>,
    visible: bool,
) -> Result<ProgressBar, TemplateError> {
    let pb = ProgressBar::new(size);

    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return Ok(pb);
    }

    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {msg:<30!} {wide_bar} {pos}/{len}")?;

    pb.set_style(style);
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_secs(1));

    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_counts() {
        let pb = progress_bar(3, "hidden", false).expect("template should parse");
        pb.inc(2);
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.length(), Some(3));
        assert!(pb.is_hidden());
    }

    #[test]
    fn test_visible_bar_builds() {
        let pb = progress_bar(5, "Training merges", true).expect("template should parse");
        assert_eq!(pb.message(), "Training merges");
        pb.finish_and_clear();
    }
}
