//! Semantic field categories and the spellings that identify them.
//!
//! The table is ordered: when a field could belong to several categories
//! the first declared one wins, so narrower categories come before broader
//! ones (`first_name` before `full_name`, `email` before `address`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Email,
    Linkedin,
    Github,
    Website,
    Phone,
    FirstName,
    MiddleName,
    LastName,
    PreferredName,
    Company,
    JobTitle,
    School,
    Degree,
    FieldOfStudy,
    Gpa,
    GraduationDate,
    Address,
    City,
    State,
    PostalCode,
    Country,
    Location,
    Birthdate,
    Sponsorship,
    VisaStatus,
    Salary,
    Availability,
    Skills,
    Languages,
    Gender,
    Pronouns,
    Ethnicity,
    Veteran,
    Disability,
    CoverLetter,
    Resume,
    Summary,
    FullName,
}

/// One row of the table. Patterns are written with spaces between words;
/// a space matches any run of spaces, hyphens, underscores or dots, or
/// nothing at all, so "first name" also matches `firstName` and `first-name`.
/// `profile_keys` are tried in order against the flat profile: an entry
/// matches a key equal to it or ending in `.entry`.
pub struct CategoryRule {
    pub category: FieldCategory,
    pub patterns: &'static [&'static str],
    pub profile_keys: &'static [&'static str],
}

use FieldCategory::*;

pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Email,
        patterns: &["e mail"],
        profile_keys: &["email", "email_address"],
    },
    CategoryRule {
        category: Linkedin,
        patterns: &["linked in"],
        profile_keys: &["linkedin", "linkedin_url"],
    },
    CategoryRule {
        category: Github,
        patterns: &["git hub"],
        profile_keys: &["github", "github_url"],
    },
    CategoryRule {
        category: Website,
        patterns: &["website", "portfolio", "personal site", "home page"],
        profile_keys: &["website", "portfolio", "personal_website"],
    },
    CategoryRule {
        category: Phone,
        patterns: &["phone", "mobile", "cell number"],
        profile_keys: &["phone", "phone_number", "mobile"],
    },
    CategoryRule {
        category: FirstName,
        patterns: &["first name", "given name", "fname", "forename"],
        profile_keys: &["first_name", "firstname", "given_name"],
    },
    CategoryRule {
        category: MiddleName,
        patterns: &["middle name", "middle initial"],
        profile_keys: &["middle_name", "middle_initial"],
    },
    CategoryRule {
        category: LastName,
        patterns: &["last name", "family name", "surname", "lname"],
        profile_keys: &["last_name", "lastname", "surname", "family_name"],
    },
    CategoryRule {
        category: PreferredName,
        patterns: &["preferred name", "nick name"],
        profile_keys: &["preferred_name", "nickname"],
    },
    CategoryRule {
        category: Company,
        patterns: &["current company", "employer", "company", "organi[sz]ation"],
        profile_keys: &["experience.company", "company", "employer"],
    },
    CategoryRule {
        category: JobTitle,
        patterns: &["job title", "current title", "position", "current role"],
        profile_keys: &["experience.position", "position", "job_title", "title"],
    },
    CategoryRule {
        category: School,
        patterns: &["school", "university", "college", "institution"],
        profile_keys: &["education.institution", "institution", "school", "university"],
    },
    CategoryRule {
        category: Degree,
        patterns: &["degree", "qualification"],
        profile_keys: &["education.degree", "degree"],
    },
    CategoryRule {
        category: FieldOfStudy,
        patterns: &["field of study", "major", "discipline", "area of study"],
        profile_keys: &["education.field_of_study", "field_of_study", "major"],
    },
    CategoryRule {
        category: Gpa,
        patterns: &["gpa", "grade point"],
        profile_keys: &["education.gpa", "gpa"],
    },
    CategoryRule {
        category: GraduationDate,
        patterns: &["graduation", "grad date", "graduated"],
        profile_keys: &["education.end_date", "graduation_date"],
    },
    CategoryRule {
        category: Address,
        patterns: &["street address", "address line", "address"],
        profile_keys: &["address", "street", "address_line1"],
    },
    CategoryRule {
        category: City,
        patterns: &["city", "town"],
        profile_keys: &["city"],
    },
    CategoryRule {
        category: State,
        patterns: &["state", "province", "region"],
        profile_keys: &["state", "province", "region"],
    },
    CategoryRule {
        category: PostalCode,
        patterns: &["zip", "postal code", "post code"],
        profile_keys: &["zip", "zip_code", "postal_code", "postcode"],
    },
    CategoryRule {
        category: Country,
        patterns: &["country"],
        profile_keys: &["country"],
    },
    CategoryRule {
        category: Location,
        patterns: &["location", "where are you based", "current residence"],
        profile_keys: &["location", "experience.location", "city"],
    },
    CategoryRule {
        category: Birthdate,
        patterns: &["birth date", "date of birth", "dob", "birthday"],
        profile_keys: &["birthdate", "date_of_birth", "dob"],
    },
    CategoryRule {
        category: Sponsorship,
        patterns: &["sponsorship", "require sponsor", "need sponsor"],
        profile_keys: &["sponsorship", "requires_sponsorship", "needs_sponsorship"],
    },
    CategoryRule {
        category: VisaStatus,
        patterns: &[
            "visa",
            "work authori[sz]ation",
            "authori[sz]ed to work",
            "work permit",
            "right to work",
        ],
        profile_keys: &["visa_status", "work_authorization", "work_permit"],
    },
    CategoryRule {
        category: Salary,
        patterns: &["salary", "compensation", "desired pay", "expected pay"],
        profile_keys: &["salary", "desired_salary", "expected_salary"],
    },
    CategoryRule {
        category: Availability,
        patterns: &["availability", "available from", "notice period", "earliest start"],
        profile_keys: &["availability", "available_from", "notice_period"],
    },
    CategoryRule {
        category: Skills,
        patterns: &["skills", "skill set", "technologies"],
        profile_keys: &["skills"],
    },
    CategoryRule {
        category: Languages,
        patterns: &["languages spoken", "language"],
        profile_keys: &["languages.language", "languages", "language"],
    },
    CategoryRule {
        category: Gender,
        patterns: &["gender"],
        profile_keys: &["gender"],
    },
    CategoryRule {
        category: Pronouns,
        patterns: &["pronoun"],
        profile_keys: &["pronouns"],
    },
    CategoryRule {
        category: Ethnicity,
        patterns: &["ethnicity", "ethnic", "hispanic"],
        profile_keys: &["ethnicity", "race"],
    },
    CategoryRule {
        category: Veteran,
        patterns: &["veteran"],
        profile_keys: &["veteran_status", "veteran"],
    },
    CategoryRule {
        category: Disability,
        patterns: &["disability", "disabled"],
        profile_keys: &["disability_status", "disability"],
    },
    CategoryRule {
        category: CoverLetter,
        patterns: &["cover letter", "motivation letter"],
        profile_keys: &["cover_letter", "cover_letter_path"],
    },
    CategoryRule {
        category: Resume,
        patterns: &["resume", "r[eé]sum[eé]", "curriculum vitae", "cv"],
        profile_keys: &["resume", "resume_path", "cv"],
    },
    CategoryRule {
        category: Summary,
        patterns: &["summary", "about yourself", "about you"],
        profile_keys: &["summary", "about"],
    },
    CategoryRule {
        category: FullName,
        patterns: &["full name", "legal name", "your name", "name"],
        profile_keys: &["full_name", "personal.name"],
    },
];

struct CompiledRule {
    rule: &'static CategoryRule,
    patterns: Vec<Regex>,
}

static COMPILED: Lazy<Vec<CompiledRule>> = Lazy::new(|| {
    CATEGORY_RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            patterns: rule
                .patterns
                .iter()
                .filter_map(|p| Regex::new(&flexible_pattern(p)).ok())
                .collect(),
        })
        .collect()
});

/// Turn "first name" into a case-insensitive, unanchored regex where the
/// word gap accepts any separator or none.
fn flexible_pattern(pattern: &str) -> String {
    let words: Vec<&str> = pattern.split_whitespace().collect();
    format!("(?i){}", words.join(r"[\s_\-.]*"))
}

/// The first category (in table order) any identifier matches.
pub fn classify<'a, I>(identifiers: I) -> Option<&'static CategoryRule>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let identifiers = identifiers.into_iter();
    COMPILED.iter().find_map(|compiled| {
        let hit = compiled
            .patterns
            .iter()
            .any(|re| identifiers.clone().any(|id| re.is_match(id)));
        hit.then_some(compiled.rule)
    })
}

/// Whether `key` satisfies a `profile_keys` entry.
pub fn key_matches(key: &str, entry: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key == entry || key.ends_with(&format!(".{entry}"))
}
