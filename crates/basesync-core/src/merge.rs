//! Name-set differences and the ordered choice union.
//!
//! The remote API replaces a single-select field's whole choice list on
//! every update, so an update must carry existing choices plus the new ones.
//! [`merge_choices`] is the only place that list is assembled.

use std::collections::HashSet;

use crate::model::Choice;

/// Colors handed to newly added choices, cycled by position.
pub const CHOICE_PALETTE: [&str; 9] = [
    "blueLight2",
    "cyanLight2",
    "tealLight2",
    "greenLight2",
    "yellowLight2",
    "orangeLight2",
    "redLight2",
    "pinkLight2",
    "purpleLight2",
];

pub fn palette_color(index: usize) -> &'static str {
    CHOICE_PALETTE[index % CHOICE_PALETTE.len()]
}

/// `required − current`, in `required` order, first occurrence wins.
pub fn missing<'a, 'b, R, C>(required: R, current: C) -> Vec<&'a str>
where
    R: IntoIterator<Item = &'a str>,
    C: IntoIterator<Item = &'b str>,
{
    let current: HashSet<&str> = current.into_iter().collect();
    let mut seen = HashSet::new();
    required
        .into_iter()
        .filter(|name| !current.contains(*name) && seen.insert(*name))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedChoices {
    /// Full list to send: existing choices untouched, then the new ones.
    pub choices: Vec<Choice>,
    /// Names that were not present before.
    pub added: Vec<String>,
}

impl MergedChoices {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.name.clone()).collect()
    }
}

pub fn merge_choices<S: AsRef<str>>(existing: &[Choice], required: &[S]) -> MergedChoices {
    let added: Vec<String> = missing(
        required.iter().map(|s| s.as_ref()),
        existing.iter().map(|c| c.name.as_str()),
    )
    .into_iter()
    .map(str::to_string)
    .collect();

    let mut choices = existing.to_vec();
    choices.extend(
        added
            .iter()
            .enumerate()
            .map(|(i, name)| Choice::named(name.as_str()).with_color(palette_color(i))),
    );

    MergedChoices { choices, added }
}
