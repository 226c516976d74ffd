// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

/// Make a company name usable as a file or directory name.
pub fn safe_file_component(name: &str, max_chars: usize) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();

    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(max_chars)
        .collect()
}

/// One decimal with thousands separators, e.g. `1,234.5`.
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.1}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "0"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted != "0.0" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}
