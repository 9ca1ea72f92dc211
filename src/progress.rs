use indicatif::{ProgressBar, ProgressStyle};

const BYTES_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const TILES_TEMPLATE: &str = "{msg} [{bar:40.green/white}] {pos}/{len} tiles ({elapsed})";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Byte counter for a download of `total` bytes.
pub fn bytes_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(style(BYTES_TEMPLATE));
    pb.set_message(label.to_string());
    pb
}

pub fn tiles_bar(total: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(style(TILES_TEMPLATE));
    pb.set_message(label.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_parse() {
        assert!(ProgressStyle::with_template(BYTES_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(TILES_TEMPLATE).is_ok());
    }

    #[test]
    fn bars_are_sized() {
        let pb = bytes_bar(2048, "scene.ecw");
        pb.inc(1024);
        assert_eq!(pb.length(), Some(2048));
        assert_eq!(pb.position(), 1024);

        let pb = tiles_bar(6, "clipping");
        assert_eq!(pb.length(), Some(6));
    }
}
