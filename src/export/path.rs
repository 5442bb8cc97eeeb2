use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::model::{Channel, Guild};
use crate::snowflake::Snowflake;

/// Characters that cannot appear in a file name on common filesystems.
const ILLEGAL_CHARACTERS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces filesystem-illegal characters in one path segment.
pub(crate) fn escape_segment(value: &str) -> String {
    value.replace(ILLEGAL_CHARACTERS, "_")
}

/// Expands `%`-template codes in a path string.
///
/// Codes cover the guild (`%g` id, `%G` name), the parent channel (`%t` id,
/// `%T` name, `%P` position), the channel (`%c` id, `%C` name, `%p`
/// position), the range bounds (`%a`, `%b` as dates), today's date (`%d`),
/// and a literal percent (`%%`). Unrecognised codes pass through unchanged;
/// every substitution is escaped against illegal characters.
pub(crate) fn expand_template(
    template: &str,
    guild: &Guild,
    channel: &Channel,
    after: Option<Snowflake>,
    before: Option<Snowflake>,
) -> String {
    let mut expanded = String::with_capacity(template.len());
    let mut characters = template.chars();

    while let Some(character) = characters.next() {
        if character != '%' {
            expanded.push(character);
            continue;
        }

        let Some(code) = characters.next() else {
            expanded.push('%');
            break;
        };

        let substitution = match code {
            'g' => guild.id.to_string(),
            'G' => guild.name.clone(),
            't' => channel.parent.as_ref().map(|parent| parent.id.to_string()).unwrap_or_default(),
            'T' => channel.parent.as_ref().map(|parent| parent.name.clone()).unwrap_or_default(),
            'c' => channel.id.to_string(),
            'C' => channel.name.clone(),
            'p' => channel.position.unwrap_or_default().to_string(),
            'P' => channel
                .parent
                .as_ref()
                .and_then(|parent| parent.position)
                .unwrap_or_default()
                .to_string(),
            'a' => after.map(|id| id.timestamp().format("%Y-%m-%d").to_string()).unwrap_or_default(),
            'b' => before.map(|id| id.timestamp().format("%Y-%m-%d").to_string()).unwrap_or_default(),
            'd' => Utc::now().format("%Y-%m-%d").to_string(),
            '%' => "%".to_owned(),
            other => {
                expanded.push('%');
                expanded.push(other);
                continue;
            }
        };

        expanded.push_str(&escape_segment(&substitution));
    }

    expanded
}

/// Builds the default output file name for a channel export.
///
/// Shape: `<guild> - [<parent> - ]<channel> [<id>][ (range)].<ext>`.
pub(crate) fn default_file_name(
    guild: &Guild,
    channel: &Channel,
    after: Option<Snowflake>,
    before: Option<Snowflake>,
    extension: &str,
) -> String {
    let mut name = format!("{} - ", guild.name);

    if let Some(parent) = &channel.parent {
        name.push_str(&format!("{} - ", parent.name));
    }

    name.push_str(&format!("{} [{}]", channel.name, channel.id));

    let range = match (after, before) {
        (Some(after), Some(before)) => Some(format!(
            "{} to {}",
            after.timestamp().format("%Y-%m-%d"),
            before.timestamp().format("%Y-%m-%d")
        )),
        (Some(after), None) => Some(format!("after {}", after.timestamp().format("%Y-%m-%d"))),
        (None, Some(before)) => Some(format!("before {}", before.timestamp().format("%Y-%m-%d"))),
        (None, None) => None,
    };

    if let Some(range) = range {
        name.push_str(&format!(" ({range})"));
    }

    format!("{}.{extension}", escape_segment(&name))
}

/// Returns the path of the given partition.
///
/// The first partition keeps the base path; later partitions inject
/// `" [part N]"` before the extension, numbering from the partition's
/// 1-based ordinal.
pub(crate) fn partition_path(base: &Path, partition_index: u64) -> PathBuf {
    if partition_index == 0 {
        return base.to_path_buf();
    }

    let ordinal = partition_index + 1;
    let stem = base.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
    let name = base.extension().and_then(|ext| ext.to_str()).map_or_else(
        || format!("{stem} [part {ordinal}]"),
        |extension| format!("{stem} [part {ordinal}].{extension}"),
    );

    base.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixtures() -> (Guild, Channel) {
        let guild: Guild =
            serde_json::from_value(serde_json::json!({"id": "10", "name": "My/Guild"})).unwrap();
        let channel = {
            let wire = serde_json::from_value(serde_json::json!({
                "id": "20",
                "type": 0,
                "name": "general",
                "position": 4,
            }))
            .unwrap();

            Channel::from_wire(wire, None)
        };

        (guild, channel)
    }

    #[test]
    fn template_codes_expand_and_escape() {
        let (guild, channel) = fixtures();
        let expanded = expand_template("%G/%C-%p-%%-%z", &guild, &channel, None, None);

        assert_eq!(expanded, "My_Guild/general-4-%-%z");
    }

    #[test]
    fn default_name_includes_range() {
        let (guild, channel) = fixtures();
        let after = Snowflake::parse("2021-01-01").unwrap();
        let name = default_file_name(&guild, &channel, Some(after), None, "txt");

        assert_eq!(name, "My_Guild - general [20] (after 2021-01-01).txt");
    }

    #[test]
    fn partition_paths_inject_ordinals() {
        let base = Path::new("out/export.html");

        assert_eq!(partition_path(base, 0), PathBuf::from("out/export.html"));
        assert_eq!(partition_path(base, 1), PathBuf::from("out/export [part 2].html"));
        assert_eq!(partition_path(base, 2), PathBuf::from("out/export [part 3].html"));
    }

    #[test]
    fn extensionless_bases_still_partition() {
        assert_eq!(partition_path(Path::new("export"), 1), PathBuf::from("export [part 2]"));
    }
}
