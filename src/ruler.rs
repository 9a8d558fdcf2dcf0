// labels & tick placement for the bp ruler drawn above each block

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub kind: TickKind,
    /// Interbase position of the tick
    pub base: f64,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPitch {
    pub major: f64,
    /// `0.0` if no minor ticks fit between the major ones
    pub minor: f64,
}

/// Formats `n` the way an en-US locale would: digit groups separated
/// by commas, at most three fractional digits.
pub fn to_locale(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }

    let rounded = (n * 1000.0).round() / 1000.0;
    let abs = rounded.abs();
    let int_part = abs.trunc();
    let frac = abs - int_part;

    let mut out = String::new();
    if rounded < 0.0 {
        out.push('-');
    }
    out.push_str(&group_digits(int_part as u64));

    if frac > 0.0 {
        let frac_str = format!("{frac:.3}");
        if let Some(digits) = frac_str.strip_prefix("0.") {
            let digits = digits.trim_end_matches('0');
            if !digits.is_empty() {
                out.push('.');
                out.push_str(digits);
            }
        }
    }

    out
}

fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let len = digits.len();

    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// rounds to `digits` significant digits, like JS `toPrecision` followed by `parseFloat`
fn to_precision(x: f64, digits: i32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let magnitude = x.abs().log10().floor() as i32;
    let decimals = digits - 1 - magnitude;
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// Short human-readable length, e.g. `1.23Mbp`, `12.3Kbp`, `512bp`.
pub fn get_bp_display_str(total_bp: f64) -> String {
    if (total_bp / 1_000_000.0).floor() > 0.0 {
        format!("{}Mbp", to_precision(total_bp / 1_000_000.0, 3))
    } else if (total_bp / 1_000.0).floor() > 0.0 {
        format!("{}Kbp", to_precision(total_bp / 1_000.0, 3))
    } else {
        format!("{}bp", to_locale(total_bp.floor()))
    }
}

/// Label for a ruler tick at `total_bp`; switches to megabases once a
/// pixel covers a kilobase or more.
pub fn get_tick_display_str(total_bp: f64, bp_per_px: f64) -> String {
    if (bp_per_px / 1_000.0).floor() > 0.0 {
        let mb = ((total_bp / 1_000_000.0) * 100.0).round() / 100.0;
        format!("{}M", to_locale(mb))
    } else {
        to_locale(total_bp.floor())
    }
}

pub fn choose_grid_pitch(
    scale: f64,
    min_major_pitch_px: f64,
    min_minor_pitch_px: f64,
) -> GridPitch {
    let scale = scale.abs();
    let min_major_pitch_bp = min_major_pitch_px * scale;

    let mut major = if min_major_pitch_bp > 0.0 {
        10f64.powf(min_major_pitch_bp.log10().floor())
    } else {
        0.0
    };

    // 1, 2, 5, 10, 20, 50, ...
    while major < min_major_pitch_bp {
        major *= 2.0;
        if major >= min_major_pitch_bp {
            break;
        }
        major *= 2.5;
    }
    let major = major.max(5.0);

    let major_px = major / scale;

    let minor = if major % 10.0 == 0.0 && major_px / 10.0 >= min_minor_pitch_px {
        major / 10.0
    } else if major % 5.0 == 0.0 && major_px / 5.0 >= min_minor_pitch_px {
        major / 5.0
    } else if major % 2.0 == 0.0 && major_px / 2.0 >= min_minor_pitch_px {
        major / 2.0
    } else {
        0.0
    };

    GridPitch { major, minor }
}

/// Ticks covering `start..end`, plus ~20px of slack on either side so
/// labels straddling the edge still get drawn.
///
/// A negative `bp_per_px` means the span is laid out right-to-left.
pub fn make_ticks(
    start: f64,
    end: f64,
    bp_per_px: f64,
    emit_major: bool,
    emit_minor: bool,
) -> Vec<Tick> {
    let pitch = choose_grid_pitch(bp_per_px, 60.0, 15.0);

    let (mut min_base, mut max_base) = (start, end);
    if bp_per_px < 0.0 {
        std::mem::swap(&mut min_base, &mut max_base);
    }

    min_base -= (20.0 * bp_per_px).abs() - 1.0;
    max_base += (20.0 * bp_per_px).abs() + 1.0;

    let iter_pitch = if pitch.minor > 0.0 {
        pitch.minor
    } else {
        pitch.major
    };

    let mut ticks = Vec::new();
    let mut base = (min_base / iter_pitch).floor() * iter_pitch;
    let stop = (max_base / iter_pitch + 1.0).ceil() * iter_pitch;

    while base < stop {
        let is_major = base % (pitch.major * 2.0) == 0.0;

        if emit_minor && !is_major {
            ticks.push(Tick {
                kind: TickKind::Minor,
                base: base - 1.0,
                index: ticks.len(),
            });
        } else if emit_major && is_major {
            ticks.push(Tick {
                kind: TickKind::Major,
                base: base - 1.0,
                index: ticks.len(),
            });
        }

        base += iter_pitch;
    }

    ticks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_grouping() {
        assert_eq!(to_locale(0.0), "0");
        assert_eq!(to_locale(999.0), "999");
        assert_eq!(to_locale(1000.0), "1,000");
        assert_eq!(to_locale(1234567.0), "1,234,567");
        assert_eq!(to_locale(-1234.0), "-1,234");
        assert_eq!(to_locale(1234.5), "1,234.5");
        assert_eq!(to_locale(0.12345), "0.123");
    }

    #[test]
    fn bp_display_units() {
        assert_eq!(get_bp_display_str(512.0), "512bp");
        assert_eq!(get_bp_display_str(12_345.0), "12.3Kbp");
        assert_eq!(get_bp_display_str(1_234_567.0), "1.23Mbp");
        assert_eq!(get_bp_display_str(150_000.0), "150Kbp");
    }

    #[test]
    fn tick_display() {
        assert_eq!(get_tick_display_str(1_234_567.0, 10.0), "1,234,567");
        assert_eq!(get_tick_display_str(1_234_567.0, 2000.0), "1.23M");
    }

    #[test]
    fn pitch_is_one_two_five_series() {
        // 60px at 1bp/px wants >= 60bp between majors
        let pitch = choose_grid_pitch(1.0, 60.0, 15.0);
        assert_eq!(pitch.major, 100.0);
        assert_eq!(pitch.minor, 20.0);

        let pitch = choose_grid_pitch(0.01, 60.0, 15.0);
        assert_eq!(pitch.major, 5.0);

        let pitch = choose_grid_pitch(1000.0, 60.0, 15.0);
        assert_eq!(pitch.major, 100_000.0);
    }

    #[test]
    fn ticks_cover_range_in_order() {
        let ticks = make_ticks(0.0, 1000.0, 1.0, true, true);
        assert!(!ticks.is_empty());

        let first = ticks.first().unwrap().base;
        let last = ticks.last().unwrap().base;
        assert!(first <= 0.0 - 19.0);
        assert!(last >= 1000.0);

        for (i, pair) in ticks.windows(2).enumerate() {
            assert!(pair[0].base < pair[1].base);
            assert_eq!(pair[0].index, i);
        }

        let majors = ticks
            .iter()
            .filter(|t| t.kind == TickKind::Major)
            .map(|t| t.base + 1.0)
            .collect::<Vec<_>>();
        assert!(majors.contains(&200.0));
        assert!(majors.iter().all(|b| b % 200.0 == 0.0));
    }

    #[test]
    fn ticks_major_only() {
        let ticks = make_ticks(0.0, 1000.0, 1.0, true, false);
        assert!(ticks.iter().all(|t| t.kind == TickKind::Major));
    }
}
