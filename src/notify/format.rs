//! Embed rendering and size-bounded packing

use super::{
    ActionRow, Button, Embed, EmbedField, EmbedFooter, Notification, MAX_DESCRIPTION,
    MAX_EMBED_CHARS, MAX_FIELDS_PER_EMBED, MAX_FIELD_VALUE,
};
use crate::model::{AnimalEntry, SECRET_RARITY};
use crate::money::format_human;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Header used for every rarity block after the first one of a location
const BLANK_HEADER: &str = "\u{200B}";
const OTHER_BUCKET: &str = "Other";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Embed color (RGB)
    pub color: u32,
    /// Game place id; enables the Place ID / Join Link / Join Script fields
    pub place_id: Option<u64>,
    /// Base URL of the web joiner
    pub join_base_url: String,
    /// Attach a link button row pointing at the joiner
    pub join_button: bool,
    /// Appended to the footer after the local time
    pub footer_text: String,
    /// Offset used to render the footer time
    pub footer_utc_offset_minutes: i32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            color: 0x2ecc71,
            place_id: None,
            join_base_url: "https://chillihub1.github.io/chillihub-joiner/".to_string(),
            join_button: false,
            footer_text: "plotstream".to_string(),
            footer_utc_offset_minutes: -360,
        }
    }
}

/// One line item of a notification
#[derive(Debug, Clone, PartialEq)]
pub struct FormatItem {
    pub name: String,
    pub value: Option<f64>,
    pub location: String,
    pub rarity: String,
}

impl From<&AnimalEntry> for FormatItem {
    fn from(entry: &AnimalEntry) -> Self {
        Self {
            name: entry.name.clone(),
            value: entry.value,
            location: entry.location.clone(),
            rarity: entry.rarity.clone(),
        }
    }
}

impl FormatItem {
    /// Item whose display name carries the mutation, e.g. `Arctic Fox [Golden]`
    pub fn with_mutation(entry: &AnimalEntry) -> Self {
        let mut item = Self::from(entry);
        if !entry.mutation.trim().is_empty() {
            item.name = format!("{} [{}]", entry.name, entry.mutation.trim());
        }
        item
    }
}

type RarityGroup<'a> = (String, Vec<&'a FormatItem>);
type LocationGroup<'a> = (String, Vec<RarityGroup<'a>>);

/// Renders items into embeds
#[derive(Debug, Clone, Default)]
pub struct EmbedFormatter {
    config: FormatConfig,
}

impl EmbedFormatter {
    pub fn new(config: FormatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    pub fn build(&self, job_id: &str, label: &str, items: &[FormatItem]) -> Notification {
        self.build_at(job_id, label, items, Utc::now())
    }

    /// Render with an explicit clock for the footer
    pub fn build_at(
        &self,
        job_id: &str,
        label: &str,
        items: &[FormatItem],
        now: DateTime<Utc>,
    ) -> Notification {
        let mut sorted: Vec<FormatItem> = items.to_vec();
        sorted.sort_by(|a, b| cmp_value_desc(a.value, b.value));

        let description = truncate_chars(&summary(&sorted), MAX_DESCRIPTION);

        let mut fields = Vec::new();
        for (location, rarities) in group(&sorted) {
            for (i, (rarity, rows)) in rarities.iter().enumerate() {
                let name = if i == 0 {
                    format!("__**{}**__", location)
                } else {
                    BLANK_HEADER.to_string()
                };
                let lines: Vec<String> = rows.iter().map(|item| render_row(item)).collect();
                let mut value = format!("**{}**", rarity);
                if !lines.is_empty() {
                    value.push('\n');
                    value.push_str(&lines.join("\n"));
                }
                fields.push(EmbedField {
                    name,
                    value,
                    inline: false,
                });
            }
        }

        let join_link = self.join_link(job_id);
        fields.extend(self.meta_fields(job_id, join_link.as_deref()));

        let footer = EmbedFooter {
            text: self.footer_text(now),
        };
        let embeds = pack(label, &description, self.config.color, &footer, fields);

        let components = match (&join_link, self.config.join_button) {
            (Some(url), true) => vec![ActionRow::new(vec![Button::link("Join", url)])],
            _ => Vec::new(),
        };

        Notification { embeds, components }
    }

    fn join_link(&self, job_id: &str) -> Option<String> {
        let place_id = self.config.place_id?;
        match reqwest::Url::parse_with_params(
            &self.config.join_base_url,
            &[
                ("placeId", place_id.to_string()),
                ("gameInstanceId", job_id.to_string()),
            ],
        ) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!("Invalid join_base_url {}: {}", self.config.join_base_url, e);
                None
            }
        }
    }

    /// Job ID first, then the join block when a place id is configured
    fn meta_fields(&self, job_id: &str, join_link: Option<&str>) -> Vec<EmbedField> {
        let mut fields = vec![code_field("Job ID", job_id)];
        if let Some(place_id) = self.config.place_id {
            fields.push(code_field("Place ID", &place_id.to_string()));
            if let Some(link) = join_link {
                fields.push(EmbedField {
                    name: "Join Link".to_string(),
                    value: format!("[Click to Join]({})", link),
                    inline: false,
                });
            }
            let script = format!(
                "game:GetService(\"TeleportService\"):TeleportToPlaceInstance({},\"{}\",game.Players.LocalPlayer)",
                place_id, job_id
            );
            fields.push(code_field("Join Script", &script));
        }
        fields
    }

    fn footer_text(&self, now: DateTime<Utc>) -> String {
        let offset = FixedOffset::east_opt(self.config.footer_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        let local = now.with_timezone(&offset);
        format!("Today at {} • {}", local.format("%H:%M:%S"), self.config.footer_text)
    }
}

fn code_field(name: &str, value: &str) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: format!("```{}```", value),
        inline: false,
    }
}

fn render_row(item: &FormatItem) -> String {
    match item.value {
        Some(v) => format!("• {} - **{}/s**", item.name, format_human(v)),
        None => format!("• {} - *pending*", item.name),
    }
}

/// Missing values sort after every real value
fn cmp_value_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn best(items: &[&FormatItem]) -> Option<f64> {
    items
        .iter()
        .filter_map(|i| i.value)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

fn location_best(rarities: &[RarityGroup<'_>]) -> Option<f64> {
    rarities
        .iter()
        .filter_map(|(_, rows)| best(rows))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

fn rarity_label(rarity: &str) -> String {
    let trimmed = rarity.trim();
    if trimmed.is_empty() {
        OTHER_BUCKET.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `**TOTAL:** n` plus the per-rarity breakdown, Secret first
fn summary(items: &[FormatItem]) -> String {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items {
        *counts.entry(rarity_label(&item.rarity)).or_insert(0) += 1;
    }

    let mut parts = Vec::new();
    if let Some(secret) = counts.remove(SECRET_RARITY) {
        parts.push(format!("{} {}", SECRET_RARITY, secret));
    }
    let mut rest: Vec<(String, usize)> = counts.into_iter().collect();
    rest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    parts.extend(rest.into_iter().map(|(k, v)| format!("{} {}", k, v)));

    let mut out = format!("**TOTAL:** {}", items.len());
    if !parts.is_empty() {
        out.push('\n');
        out.push_str(&parts.join(" | "));
    }
    out
}

/// Location groups ordered by best value, rarity groups likewise
fn group(items: &[FormatItem]) -> Vec<LocationGroup<'_>> {
    let mut locations: Vec<LocationGroup<'_>> = Vec::new();
    for item in items {
        let pos = match locations.iter().position(|(loc, _)| *loc == item.location) {
            Some(pos) => pos,
            None => {
                locations.push((item.location.clone(), Vec::new()));
                locations.len() - 1
            }
        };
        let rarities = &mut locations[pos].1;
        let label = rarity_label(&item.rarity);
        match rarities.iter_mut().find(|(r, _)| *r == label) {
            Some((_, rows)) => rows.push(item),
            None => rarities.push((label, vec![item])),
        }
    }

    for (_, rarities) in locations.iter_mut() {
        for (_, rows) in rarities.iter_mut() {
            rows.sort_by(|a, b| cmp_value_desc(a.value, b.value));
        }
        rarities.sort_by(|a, b| cmp_value_desc(best(&a.1), best(&b.1)));
    }
    locations.sort_by(|a, b| cmp_value_desc(location_best(&a.1), location_best(&b.1)));
    locations
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push('…');
    out
}

/// Split into pieces of at most `max` characters
pub(crate) fn chunk_chars(s: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max || max == 0 {
        return vec![s.to_string()];
    }
    chars.chunks(max).map(|c| c.iter().collect()).collect()
}

/// Distribute fields over embeds within the field-count and character budgets.
///
/// Oversized values are split into `(cont.)` fields; an overflowing field
/// closes the current embed and opens a `(cont.)` one.
pub(crate) fn pack(
    title: &str,
    description: &str,
    color: u32,
    footer: &EmbedFooter,
    fields: Vec<EmbedField>,
) -> Vec<Embed> {
    let new_embed = |title: String| Embed {
        title,
        description: description.to_string(),
        color,
        fields: Vec::new(),
        footer: Some(footer.clone()),
    };

    let mut embeds = Vec::new();
    let mut current = new_embed(title.to_string());
    let mut chars = current.size();

    for field in fields {
        for (i, chunk) in chunk_chars(&field.value, MAX_FIELD_VALUE).into_iter().enumerate() {
            let name = if i == 0 {
                field.name.clone()
            } else {
                format!("{} (cont.)", field.name)
            };
            let add = name.chars().count() + chunk.chars().count() + 10;

            if current.fields.len() >= MAX_FIELDS_PER_EMBED || chars + add > MAX_EMBED_CHARS {
                let next = new_embed(format!("{} (cont.)", title));
                let closed = std::mem::replace(&mut current, next);
                if !closed.fields.is_empty() {
                    embeds.push(closed);
                }
                chars = current.size();
            }

            current.fields.push(EmbedField {
                name,
                value: chunk,
                inline: false,
            });
            chars += add;
        }
    }

    if !current.fields.is_empty() {
        embeds.push(current);
    }
    embeds
}
