//! # NMEA parsing
//!
//! Only GGA (fix data) sentences are needed. Any talker is accepted (`$GNGGA` from the RTK
//! receiver, `$GPGGA` from plain GPS units).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::auto::geo::GeoPoint;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NmeaError {
    #[error("Not a GGA sentence")]
    NotGga,

    #[error("Sentence has {0} fields, at least 7 are required")]
    TooShort(usize),

    #[error("Checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    BadChecksum { expected: u8, computed: u8 },

    #[error("Invalid {0} field")]
    InvalidField(&'static str),

    #[error("Receiver reports no fix")]
    NoFix,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse the position from a GGA sentence.
///
/// The checksum is verified if one is present. A fix quality of 0 means the receiver has no fix
/// and the sentence is rejected.
pub fn parse_gga(line: &str) -> Result<GeoPoint, NmeaError> {
    let line = line.trim();
    let body = line.strip_prefix('$').ok_or(NmeaError::NotGga)?;

    let body = match body.find('*') {
        Some(i) => {
            let expected = u8::from_str_radix(body[i + 1..].trim(), 16)
                .map_err(|_| NmeaError::InvalidField("checksum"))?;
            let computed = checksum(&body[..i]);

            if expected != computed {
                return Err(NmeaError::BadChecksum { expected, computed });
            }

            &body[..i]
        }
        None => body,
    };

    let fields: Vec<&str> = body.split(',').collect();

    // Two character talker followed by the sentence type
    if fields[0].len() != 5 || !fields[0].ends_with("GGA") {
        return Err(NmeaError::NotGga);
    }

    if fields.len() < 7 {
        return Err(NmeaError::TooShort(fields.len()));
    }

    let quality: u8 = fields[6]
        .parse()
        .map_err(|_| NmeaError::InvalidField("fix quality"))?;
    if quality == 0 {
        return Err(NmeaError::NoFix);
    }

    let lat = match fields[3] {
        "N" => 1.0,
        "S" => -1.0,
        _ => return Err(NmeaError::InvalidField("latitude hemisphere")),
    } * ddmm_to_deg(fields[2]).ok_or(NmeaError::InvalidField("latitude"))?;

    let lon = match fields[5] {
        "E" => 1.0,
        "W" => -1.0,
        _ => return Err(NmeaError::InvalidField("longitude hemisphere")),
    } * ddmm_to_deg(fields[4]).ok_or(NmeaError::InvalidField("longitude"))?;

    Ok(GeoPoint { lon, lat })
}

/// True if the line is a GGA sentence from any talker, whatever its content.
pub fn is_gga(line: &str) -> bool {
    line.trim()
        .strip_prefix('$')
        .and_then(|b| b.split(|c| c == ',' || c == '*').next())
        .map(|t| t.len() == 5 && t.ends_with("GGA"))
        .unwrap_or(false)
}

/// XOR of all bytes between the `$` and the `*`.
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Convert a `(d)ddmm.mmmm` field into decimal degrees.
fn ddmm_to_deg(field: &str) -> Option<f64> {
    let value: f64 = field.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let degrees = (value / 100.0).floor();
    let minutes = value - degrees * 100.0;

    Some(degrees + minutes / 60.0)
}
