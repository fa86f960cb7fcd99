//! GEO value decoding (spec §3, §4.3): `lat;long`, both signed floats.

use crate::diagnostics::{Diagnostic, DiagnosticBus};

pub fn decode_geo(raw: &str, line_number: u32, bus: &mut DiagnosticBus) -> (f64, f64) {
    let Some((lat_raw, long_raw)) = raw.split_once(';') else {
        bus.push(
            Diagnostic::new("3.8.1.6_1", line_number, raw)
                .with_annotation("GEO value must be 'lat;long'"),
        );
        return (0.0, 0.0);
    };

    let lat = lat_raw.trim().parse::<f64>().unwrap_or_else(|_| {
        bus.push(Diagnostic::new("3.8.1.6_1", line_number, raw).with_annotation("malformed latitude"));
        0.0
    });
    let long = long_raw.trim().parse::<f64>().unwrap_or_else(|_| {
        bus.push(Diagnostic::new("3.8.1.6_1", line_number, raw).with_annotation("malformed longitude"));
        0.0
    });

    (lat, long)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_coordinate_pair() {
        let mut bus = DiagnosticBus::new(false);
        let (lat, long) = decode_geo("37.386013;-122.082932", 1, &mut bus);
        assert_eq!(lat, 37.386013);
        assert_eq!(long, -122.082932);
        assert!(bus.is_compliant());
    }
}
