//! Output filename convention engine.
//!
//! A catalog `outputFile` template is made filesystem-safe, its class and
//! date tokens are filled in, and the school name is appended so files from
//! different schools never collide:
//!
//! ```
//! use harvest_core::naming::{output_filename, ClassLabels};
//! use std::collections::BTreeMap;
//!
//! let sections = BTreeMap::from([("04A0".to_string(), "Grade 4 Group 1".to_string())]);
//! let grades = BTreeMap::new();
//! let labels = ClassLabels { sections: &sections, grades: &grades };
//! assert_eq!(
//!     output_filename(
//!         "Report_<class>_<start_date>_<end_date>.csv",
//!         &labels.resolve("04A0"),
//!         "01-04-2024",
//!         "30-04-2024",
//!         "Green Valley",
//!     ),
//!     "Report_Grade_4_Group_1_01-04-2024_30-04-2024_Green Valley.csv",
//! );
//! ```

use std::collections::BTreeMap;

use crate::config::level_prefix;

/// Date-token spellings accepted in templates, `(start, end)` pairs.
///
/// The `<...>` forms are what catalog authors write; the `(...)` forms are
/// what they become after [`sanitize_filename`].
const DATE_TOKENS: [(&str, &str); 4] = [
    ("<start_date>", "<end_date>"),
    ("(start_date)", "(end_date)"),
    ("<SAFE_START>", "<SAFE_END>"),
    ("(SAFE_START)", "(SAFE_END)"),
];

// ---------------------------------------------------------------------------
// Class labels
// ---------------------------------------------------------------------------

/// Label sources for class codes, passed explicitly to the resolver.
#[derive(Debug, Clone, Copy)]
pub struct ClassLabels<'a> {
    /// Section code to friendly label, from section discovery.
    pub sections: &'a BTreeMap<String, String>,
    /// Level or class code to grade label, from the run configuration.
    pub grades: &'a BTreeMap<String, String>,
}

impl ClassLabels<'_> {
    /// Human label for a class code; empty for school-wide invocations.
    ///
    /// Precedence: section label, grade label for the full code, grade
    /// label for the level prefix, then `Class <code>`.
    pub fn resolve(&self, class_code: &str) -> String {
        if class_code.is_empty() {
            return String::new();
        }
        self.sections
            .get(class_code)
            .or_else(|| self.grades.get(class_code))
            .or_else(|| self.grades.get(&level_prefix(class_code)))
            .filter(|l| !l.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("Class {class_code}"))
    }
}

// ---------------------------------------------------------------------------
// Filename helpers
// ---------------------------------------------------------------------------

/// Replace characters most filesystems reject; spaces and dashes survive.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '|' => '-',
            '"' => '\'',
            '<' => '(',
            '>' => ')',
            other => other,
        })
        .collect()
}

/// `DD/MM/YYYY` to `DD-MM-YYYY`.
pub fn date_label(date: &str) -> String {
    date.replace(['/', '\\', ':'], "-")
}

/// Append `_<school>` before the extension.
pub fn add_school_suffix(file_name: &str, school: &str) -> String {
    let school = school.trim();
    if school.is_empty() {
        return file_name.to_string();
    }
    append_tag(file_name, &sanitize_filename(school))
}

/// Insert `_<tag>` before the extension.
fn append_tag(file_name: &str, tag: &str) -> String {
    let (root, ext) = split_extension(file_name);
    format!("{root}_{tag}{ext}")
}

/// First free variant of `file_name` for a run that already wrote others.
///
/// A taken name gets `_<scope>` (class and subject codes) before the
/// extension, then a counter from `2` until `is_taken` says no.
pub fn disambiguate(file_name: &str, scope: &[&str], is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(file_name) {
        return file_name.to_string();
    }
    let scope: Vec<&str> = scope.iter().copied().filter(|s| !s.trim().is_empty()).collect();
    let base = if scope.is_empty() {
        file_name.to_string()
    } else {
        append_tag(file_name, &sanitize_filename(&scope.join("_")))
    };
    let mut candidate = base.clone();
    let mut counter = 2;
    while is_taken(&candidate) {
        candidate = append_tag(&base, &counter.to_string());
        counter += 1;
    }
    candidate
}

/// `("name", ".csv")`; the extension is empty when there is none.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.split_at(dot),
        _ => (file_name, ""),
    }
}

/// Fill class and date tokens into an already-sanitized template.
///
/// The class label goes through the same character replacement as the
/// template, so it can never introduce a path separator.
pub fn inject_class_and_dates(
    template: &str,
    class_label: &str,
    start_label: &str,
    end_label: &str,
) -> String {
    let class_label: String = sanitize_filename(class_label)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let mut name = template.replace("<class>", &class_label);
    let paren_class = if class_label.is_empty() {
        String::new()
    } else {
        format!("{class_label}_")
    };
    name = name.replace("(class)", &paren_class);
    for (start, end) in DATE_TOKENS {
        name = name.replace(start, start_label).replace(end, end_label);
    }

    if !class_label.is_empty() && !start_label.is_empty() {
        name = name.replace(
            &format!("{class_label}{start_label}"),
            &format!("{class_label}_{start_label}"),
        );
    }
    if !start_label.is_empty() && !end_label.is_empty() {
        name = name.replace(
            &format!("{start_label}{end_label}"),
            &format!("{start_label}_{end_label}"),
        );
    }
    while name.contains("__") {
        name = name.replace("__", "_");
    }

    // A trailing `(class)` leaves a dangling separator before the extension.
    let (root, ext) = split_extension(&name);
    let root = root.trim_end_matches('_');
    if root.is_empty() {
        name
    } else {
        format!("{root}{ext}")
    }
}

/// Full filename pipeline for one output file.
pub fn output_filename(
    template: &str,
    class_label: &str,
    start_label: &str,
    end_label: &str,
    school: &str,
) -> String {
    let safe = sanitize_filename(template);
    let named = inject_class_and_dates(&safe, class_label, start_label, end_label);
    add_school_suffix(&named, school)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
