//! Advance widths for the standard fonts, from the Adobe AFM files.
//!
//! Tables cover printable ASCII (32..=126) in 1/1000 em. Characters outside
//! that range fall back to a letter of similar shape: accented Latin letters
//! use their base letter, other alphabetic characters use `n` / `N`, so
//! Cyrillic text measures close to what a browser reports for Arial.

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48-63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80-95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96-111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112-126
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 48-63
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 64-79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 80-95
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 96-111
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 112-126
];

const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // 32-47
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // 48-63
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // 64-79
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // 80-95
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // 96-111
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, // 112-126
];

const COURIER: [u16; 95] = [600; 95];

/// Width table for one standard face.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    widths: &'static [u16; 95],
    /// Multiplier applied on top of the table, for faces approximated from
    /// a sibling (Times bold from Times roman).
    scale: f64,
}

impl StandardFontMetrics {
    pub const HELVETICA: StandardFontMetrics = StandardFontMetrics {
        widths: &HELVETICA,
        scale: 1.0,
    };
    pub const HELVETICA_BOLD: StandardFontMetrics = StandardFontMetrics {
        widths: &HELVETICA_BOLD,
        scale: 1.0,
    };
    pub const TIMES: StandardFontMetrics = StandardFontMetrics {
        widths: &TIMES_ROMAN,
        scale: 1.0,
    };
    pub const TIMES_BOLD: StandardFontMetrics = StandardFontMetrics {
        widths: &TIMES_ROMAN,
        scale: 1.04,
    };
    pub const COURIER: StandardFontMetrics = StandardFontMetrics {
        widths: &COURIER,
        scale: 1.0,
    };

    fn units(&self, ch: char) -> u16 {
        let code = ch as u32;
        if (32..=126).contains(&code) {
            return self.widths[(code - 32) as usize];
        }
        match ch {
            '\u{00A0}' => self.widths[0],
            '\u{00AD}' | '\u{200B}' => 0,
            '●' | '○' | '•' => 600,
            '—' => 1000,
            '–' => 556,
            '·' => self.widths[('.' as u32 - 32) as usize],
            _ => {
                if let Some(base) = latin_base(ch) {
                    return self.units(base);
                }
                if ch.is_uppercase() {
                    self.widths[('N' as u32 - 32) as usize]
                } else if ch.is_alphabetic() && (ch as u32) < 0x2E80 {
                    self.widths[('n' as u32 - 32) as usize]
                } else if (ch as u32) >= 0x2E80 {
                    // CJK and friends are full-width.
                    1000
                } else {
                    self.widths[('0' as u32 - 32) as usize]
                }
            }
        }
    }

    /// Advance width of `ch` at `font_size`, in the same unit as `font_size`.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.units(ch) as f64 / 1000.0 * font_size * self.scale
    }

    pub fn measure_string(&self, text: &str, font_size: f64, letter_spacing: f64) -> f64 {
        text.chars()
            .map(|ch| self.char_width(ch, font_size) + letter_spacing)
            .sum()
    }
}

/// Base letter for common accented Latin characters.
fn latin_base(ch: char) -> Option<char> {
    let base = match ch {
        'ä' | 'à' | 'á' | 'â' | 'ã' | 'å' => 'a',
        'Ä' | 'À' | 'Á' | 'Â' | 'Ã' | 'Å' => 'A',
        'ö' | 'ò' | 'ó' | 'ô' | 'õ' | 'ø' => 'o',
        'Ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' => 'O',
        'ü' | 'ù' | 'ú' | 'û' => 'u',
        'Ü' | 'Ù' | 'Ú' | 'Û' => 'U',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ß' => 'b',
        _ => return None,
    };
    Some(base)
}
