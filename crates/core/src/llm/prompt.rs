//! Prompt construction for outline and chunk calls.

use std::fmt::Write;

use crate::generation::ChunkRequest;
use crate::trip::{Budget, ContextArticle, TripPreferences};

/// Context articles are trimmed to this many characters.
const MAX_ARTICLE_CHARS: usize = 500;

const ROLE: &str = "You are a travel planner who writes practical, vivid itineraries. \
Prefer places locals actually go to, keep timings realistic including travel time, \
and avoid robotic lists.";

const OUTLINE_TASK: &str = r#"Plan the route of the trip at a low level of detail.
Respond with a single JSON object and nothing else:
{
  "destination": "string",
  "description": "one paragraph",
  "days": [
    {"day": 1, "title": "string", "overnight_location": "string", "highlight_areas": ["string"]}
  ]
}
Number days from 1 without gaps."#;

const CHUNK_TASK: &str = r#"Write the detailed schedule for the requested days only, following the outline.
Respond with a single JSON object and nothing else:
{
  "days": [
    {
      "day": 1,
      "title": "string",
      "activities": [
        {"time": "09:00", "name": "string", "description": "1-2 sentences", "kind": "spot|meal|transit|accommodation|other", "location": "string"}
      ]
    }
  ]
}"#;

/// System prompt for the outline call.
pub fn outline_system(context: &[ContextArticle]) -> String {
    let mut system = format!("{ROLE}\n\n[TASK]\n{OUTLINE_TASK}");
    push_context(&mut system, context);
    system
}

/// User prompt for the outline call.
pub fn outline_prompt(preferences: &TripPreferences) -> String {
    let mut prompt = String::from("[TRAVELER]\n");
    push_preferences(&mut prompt, preferences);
    match preferences.duration.days() {
        0 => prompt.push_str("Duration: choose a sensible length for the destination.\n"),
        days => {
            let _ = writeln!(prompt, "Duration: exactly {days} days.");
        }
    }
    prompt
}

/// System prompt for a chunk call.
pub fn chunk_system(request: &ChunkRequest) -> String {
    let mut system = format!("{ROLE}\n\n[TASK]\n{CHUNK_TASK}");
    push_context(&mut system, &request.context);
    system
}

/// User prompt for a chunk call.
pub fn chunk_prompt(request: &ChunkRequest) -> String {
    let mut prompt = String::from("[TRAVELER]\n");
    push_preferences(&mut prompt, &request.preferences);

    let _ = writeln!(
        prompt,
        "\n[DAYS]\nWrite days {} to {} of a {}-day trip to {}.",
        request.range.start,
        request.range.end,
        request.preferences.duration.days(),
        request.destination
    );
    if let Some(location) = &request.previous_overnight_location {
        let _ = writeln!(prompt, "The traveler starts day {} in {}.", request.range.start, location);
    }

    prompt.push_str("\n[OUTLINE]\n");
    for day in &request.outline_days {
        let _ = write!(
            prompt,
            "Day {}: {} (overnight: {})",
            day.day, day.title, day.overnight_location
        );
        if !day.highlight_areas.is_empty() {
            let _ = write!(prompt, " - {}", day.highlight_areas.join(", "));
        }
        prompt.push('\n');
    }

    let pinned: Vec<_> = request
        .preferences
        .transit_segments
        .iter()
        .filter(|s| s.day.is_some_and(|d| request.range.contains(d)))
        .collect();
    if !pinned.is_empty() {
        prompt.push_str("\n[BOOKED TRANSIT]\nKeep these exactly as given:\n");
        for segment in pinned {
            let _ = writeln!(
                prompt,
                "Day {}: {:?} {} -> {} {}",
                segment.day.unwrap_or_default(),
                segment.mode,
                segment.departure_place,
                segment.arrival_place,
                segment.departure_time.as_deref().unwrap_or("")
            );
        }
    }

    prompt
}

fn push_preferences(out: &mut String, preferences: &TripPreferences) {
    match preferences.destination_label() {
        Some(destination) if preferences.destination_decided => {
            let _ = writeln!(out, "Destination: {destination}");
        }
        _ => {
            let region = preferences.region.as_deref().unwrap_or("anywhere");
            let _ = writeln!(out, "Destination: not decided, suggest one in {region}");
        }
    }
    if let Some(vibe) = &preferences.vibe {
        let _ = writeln!(out, "Mood: {vibe}");
    }
    let _ = writeln!(out, "Companions: {:?}", preferences.companions);
    if !preferences.themes.is_empty() {
        let themes: Vec<&str> = preferences.themes.iter().map(String::as_str).collect();
        let _ = writeln!(out, "Themes: {}", themes.join(", "));
    }
    match &preferences.budget {
        Some(Budget::Tier(tier)) => {
            let _ = writeln!(out, "Budget: {:?}", tier);
        }
        Some(Budget::Range { min, max, currency }) => {
            let _ = writeln!(
                out,
                "Budget: {min}-{max} {}",
                currency.as_deref().unwrap_or("")
            );
        }
        None => {}
    }
    if let Some(pace) = preferences.pace {
        let _ = writeln!(out, "Pace: {:?}", pace);
    }
    if !preferences.must_visit_places.is_empty() {
        let _ = writeln!(out, "Must visit: {}", preferences.must_visit_places.join(", "));
    }
    if !preferences.notes.trim().is_empty() {
        let _ = writeln!(out, "Notes: {}", preferences.notes.trim());
    }
}

fn push_context(out: &mut String, context: &[ContextArticle]) {
    if context.is_empty() {
        return;
    }
    out.push_str("\n\n[CONTEXT]\nPrefer recommendations from these articles:\n");
    for (i, article) in context.iter().enumerate() {
        let _ = writeln!(out, "[ARTICLE_{}] {} ({})", i + 1, article.title, article.url);
        if let Some(snippet) = &article.snippet {
            let trimmed: String = snippet.chars().take(MAX_ARTICLE_CHARS).collect();
            let _ = writeln!(out, "{trimmed}");
        }
    }
}
