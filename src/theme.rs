// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Presentation-token derivation from branding colors.
//!
//! The core never touches a rendering surface; it only exposes this pure
//! mapping for the presentation layer to consume.

use crate::profile::BrandingColors;
use std::collections::BTreeMap;

/// Converts the four branding colors into HSL presentation tokens.
///
/// Token keys match the CSS custom properties the presentation layer binds:
/// `--background`, `--foreground`, `--primary`, `--secondary`. Values are
/// `"<hue> <saturation>% <lightness>%"` strings.
pub fn colors_to_tokens(colors: &BrandingColors) -> BTreeMap<String, String> {
    let mut tokens = BTreeMap::new();
    tokens.insert("--background".to_owned(), hex_to_hsl(&colors.background));
    tokens.insert("--foreground".to_owned(), hex_to_hsl(&colors.text));
    tokens.insert("--primary".to_owned(), hex_to_hsl(&colors.primary));
    tokens.insert("--secondary".to_owned(), hex_to_hsl(&colors.secondary));
    tokens
}

/// Converts a `#RRGGBB` hex color to an `"H S% L%"` HSL string.
///
/// Malformed input degrades to black rather than failing; branding colors are
/// cosmetic and must never abort an operation.
pub fn hex_to_hsl(hex: &str) -> String {
    let value = u32::from_str_radix(hex.trim_start_matches('#'), 16).unwrap_or(0);
    let r = f64::from((value >> 16) & 255) / 255.0;
    let g = f64::from((value >> 8) & 255) / 255.0;
    let b = f64::from(value & 255) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;

    let (h, s) = if d == 0.0 {
        (0.0, 0.0)
    } else {
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (h / 6.0, s)
    };

    format!(
        "{} {}% {}%",
        (h * 360.0).round() as i64,
        (s * 100.0).round() as i64,
        (l * 100.0).round() as i64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_and_black() {
        assert_eq!(hex_to_hsl("#FFFFFF"), "0 0% 100%");
        assert_eq!(hex_to_hsl("#000000"), "0 0% 0%");
    }

    #[test]
    fn pure_red() {
        assert_eq!(hex_to_hsl("#FF0000"), "0 100% 50%");
    }

    #[test]
    fn malformed_hex_degrades_to_black() {
        assert_eq!(hex_to_hsl("not-a-color"), "0 0% 0%");
    }

    #[test]
    fn default_colors_produce_all_four_tokens() {
        let tokens = colors_to_tokens(&BrandingColors::default());
        assert_eq!(tokens.len(), 4);
        assert!(tokens.contains_key("--background"));
        assert!(tokens.contains_key("--foreground"));
        assert!(tokens.contains_key("--primary"));
        assert!(tokens.contains_key("--secondary"));
        // Emerald primary #10B981 lands in the green hue band.
        let primary = &tokens["--primary"];
        let hue: i64 = primary.split(' ').next().unwrap().parse().unwrap();
        assert!((120..=180).contains(&hue), "unexpected hue in {primary}");
    }
}
