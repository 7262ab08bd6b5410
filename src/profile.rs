// Child profile collected by the intake form.

use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgeRange {
    #[default]
    NotSpecified,
    Newborn,
    Infant,
    Toddler,
    Preschooler,
    SchoolAge,
    Teenager,
}

impl AgeRange {
    /// All options, in the order the form lists them.
    pub const ALL: [AgeRange; 7] = [
        AgeRange::NotSpecified,
        AgeRange::Newborn,
        AgeRange::Infant,
        AgeRange::Toddler,
        AgeRange::Preschooler,
        AgeRange::SchoolAge,
        AgeRange::Teenager,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeRange::NotSpecified => "Not specified",
            AgeRange::Newborn => "Newborn (0-3 months)",
            AgeRange::Infant => "Infant (3-12 months)",
            AgeRange::Toddler => "Toddler (1-3 years)",
            AgeRange::Preschooler => "Preschooler (3-5 years)",
            AgeRange::SchoolAge => "School-Age (6-12 years)",
            AgeRange::Teenager => "Teenager (13+ years)",
        }
    }

    pub fn is_specified(self) -> bool {
        self != AgeRange::NotSpecified
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeRange {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgeRange::ALL
            .into_iter()
            .find(|age| age.label() == s)
            .ok_or_else(|| SessionError::UnknownOption {
                field: "age_range",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperament {
    Easygoing,
    Active,
    Shy,
    Intense,
    Distractible,
    Persistent,
}

impl Temperament {
    pub const ALL: [Temperament; 6] = [
        Temperament::Easygoing,
        Temperament::Active,
        Temperament::Shy,
        Temperament::Intense,
        Temperament::Distractible,
        Temperament::Persistent,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Temperament::Easygoing => "Easygoing / Adaptable",
            Temperament::Active => "Active / Energetic",
            Temperament::Shy => "Shy / Cautious",
            Temperament::Intense => "Intense / Sensitive",
            Temperament::Distractible => "Distractible",
            Temperament::Persistent => "Persistent / Strong-willed",
        }
    }
}

impl fmt::Display for Temperament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Temperament {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Temperament::ALL
            .into_iter()
            .find(|temperament| temperament.label() == s)
            .ok_or_else(|| SessionError::UnknownOption {
                field: "temperament",
                value: s.to_string(),
            })
    }
}

/// Raw answers from the intake form, already checked against the option lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSubmission {
    pub age_range: AgeRange,
    pub temperament_traits: Vec<Temperament>,
    pub current_challenges: String,
}

impl FormSubmission {
    /// Builds a submission from form labels. A missing age range falls back to
    /// "Not specified"; every other value must name a known option.
    pub fn from_labels<'a>(
        age_range: Option<&str>,
        temperament: impl IntoIterator<Item = &'a str>,
        challenges: &str,
    ) -> Result<Self, SessionError> {
        let age_range = match age_range {
            Some(label) => label.parse()?,
            None => AgeRange::NotSpecified,
        };
        let temperament_traits = temperament
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<Temperament>, _>>()?;

        Ok(Self {
            age_range,
            temperament_traits,
            current_challenges: challenges.to_string(),
        })
    }
}

/// What the session knows about the child. Only replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    pub child_age_range: Option<AgeRange>,
    pub temperament_traits: Vec<Temperament>,
    pub current_challenges: String,
    pub form_completed: bool,
}

impl SessionContext {
    pub fn from_submission(submission: FormSubmission) -> Self {
        // Ordered set: first selection wins, later duplicates are dropped.
        let mut traits: Vec<Temperament> = Vec::with_capacity(submission.temperament_traits.len());
        for selected in submission.temperament_traits {
            if !traits.contains(&selected) {
                traits.push(selected);
            }
        }

        Self {
            child_age_range: Some(submission.age_range),
            temperament_traits: traits,
            current_challenges: submission.current_challenges,
            form_completed: true,
        }
    }

    /// Trimmed challenges text, or `None` when blank.
    pub fn challenges(&self) -> Option<&str> {
        let trimmed = self.current_challenges.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
