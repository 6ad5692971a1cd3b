//! Assembling detailed days into the finished itinerary.

use thiserror::Error;
use tracing::warn;

use crate::trip::{ContextArticle, DayPlan, HeroImage, Itinerary, ModelInfo, Outline, Reference};

/// The collected days do not cover the trip exactly once.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("day {0} is missing")]
    MissingDay(u32),

    #[error("day {day} is outside the {total_days}-day trip")]
    UnexpectedDay { day: u32, total_days: u32 },
}

/// Sort days by number and collapse duplicates.
///
/// `days` is in completion order; for a duplicated day number the entry that
/// completed last wins. The result must cover `1..=total_days` exactly.
pub fn merge_days(days: &[DayPlan], total_days: u32) -> Result<Vec<DayPlan>, MergeError> {
    let mut indexed: Vec<(usize, &DayPlan)> = days.iter().enumerate().collect();
    // Stable on the completion index, so the last entry of each run is the newest.
    indexed.sort_by_key(|(seq, plan)| (plan.day, *seq));

    let mut merged: Vec<DayPlan> = Vec::with_capacity(total_days as usize);
    for (_, plan) in indexed {
        if plan.day == 0 || plan.day > total_days {
            return Err(MergeError::UnexpectedDay {
                day: plan.day,
                total_days,
            });
        }
        match merged.last_mut() {
            Some(last) if last.day == plan.day => {
                warn!(day = plan.day, "Duplicate day in merge, keeping the latest");
                *last = plan.clone();
            }
            _ => merged.push(plan.clone()),
        }
    }

    for (expected, plan) in (1..=total_days).zip(merged.iter()) {
        if plan.day != expected {
            return Err(MergeError::MissingDay(expected));
        }
    }
    if (merged.len() as u32) < total_days {
        return Err(MergeError::MissingDay(merged.len() as u32 + 1));
    }

    Ok(merged)
}

/// Everything besides the days that goes into an itinerary.
#[derive(Debug, Clone, Default)]
pub struct ItineraryParts<'a> {
    pub outline: Option<&'a Outline>,
    pub hero_image: Option<&'a HeroImage>,
    pub context: &'a [ContextArticle],
    pub model_info: Option<&'a ModelInfo>,
}

/// Build the itinerary from merged days.
pub fn build_itinerary(parts: ItineraryParts<'_>, days: Vec<DayPlan>) -> Itinerary {
    let (destination, description) = parts
        .outline
        .map(|o| (o.destination.clone(), o.description.clone()))
        .unwrap_or_default();

    Itinerary {
        id: uuid::Uuid::new_v4().to_string(),
        destination,
        description,
        hero_image: parts.hero_image.cloned(),
        days,
        references: parts.context.iter().map(Reference::from).collect(),
        model_info: parts.model_info.cloned(),
    }
}
