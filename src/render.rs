use crate::models::Entry;
use crate::shelf::Notice;
use crate::storage::Capacity;
use crate::url::is_valid_url;

const PREVIEW: &str = "[img]";
const PLACEHOLDER: &str = "[   ]";

/// Marker shown in place of the preview image.
pub fn preview_marker(entry: &Entry) -> &'static str {
    if is_valid_url(entry.favicon_url()) {
        PREVIEW
    } else {
        PLACEHOLDER
    }
}

/// One tab separated line per entry. With `pretty`, titles and texts are
/// padded into columns.
pub fn render_entries(entries: &[&Entry], pretty: bool) -> String {
    let mut longest_title = 0;
    let mut longest_text = 0;
    if pretty {
        for entry in entries {
            longest_title = longest_title.max(entry.title().chars().count());
            longest_text = longest_text.max(entry.text.chars().count());
        }
    }

    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{}\t{}\t{: <longest_title$}\t{: <longest_text$}\t{}\n",
            entry.id,
            preview_marker(entry),
            entry.title(),
            entry.text,
            entry.category,
            longest_title = longest_title,
            longest_text = longest_text
        ));
    }
    out
}

pub fn render_capacity(capacity: &Capacity) -> String {
    format!(
        "Storage: {:.2}% remaining ({} bytes)",
        capacity.percent_remaining, capacity.remaining_bytes
    )
}

pub fn render_notice(notice: &Notice) -> String {
    format!("{} {}", notice.title, notice.description)
}
