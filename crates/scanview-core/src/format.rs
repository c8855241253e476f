//! Display formatting for confidence scores and log-safe patient names.
//!
//! Formatting never touches the stored value; callers pass the raw `[0, 1]`
//! confidence and get a string back.

/// Two-decimal percentage, e.g. `0.8734` -> `87.34%`. Exact ties round up
/// (`0.00625` -> `0.63%`); `{:.2}` alone would round them to even.
pub fn percent_precise(confidence: f64) -> String {
    let percent = confidence * 100.0;
    let hundredths = percent * 100.0;
    if hundredths - hundredths.trunc() == 0.5 {
        return format!("{:.2}%", (hundredths.trunc() + 1.0) / 100.0);
    }
    format!("{:.2}%", percent)
}

/// Whole-number percentage without the sign, e.g. `0.876` -> `88`.
pub fn percent_rounded(confidence: f64) -> i64 {
    (confidence * 100.0).round() as i64
}

/// Mask a patient name for log lines (`Jane Doe` -> `Jane****`).
pub fn mask_patient(name: &str) -> String {
    let visible: String = name.chars().take(4).collect();
    if name.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}
