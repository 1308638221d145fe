//! Parser for the sensor wire protocol: newline-delimited text payloads of
//! comma-separated numeric fields, of which the first four are rotation
//! components in the order `w,x,y,z`. Fields past the fourth are tolerated
//! and ignored, some firmware revisions append accelerometer data there.

use nom::{
    character::complete::{char, space0},
    combinator::map_opt,
    error::Error,
    multi::separated_list1,
    number::complete::float,
    sequence::delimited,
    Finish, IResult,
};

use std::str::FromStr;

use crate::orientation::OrientationSample;

/// One successfully decoded inbound sensor message.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPayload {
    rotation: OrientationSample,
}

impl SensorPayload {
    /// The rotation carried by the payload.
    pub fn rotation(&self) -> OrientationSample {
        self.rotation
    }
}

fn parse_field(s: &str) -> IResult<&str, f32> {
    delimited(space0, float, space0)(s)
}

fn parse_payload(s: &str) -> IResult<&str, SensorPayload> {
    map_opt(
        separated_list1(char(','), parse_field),
        |fields: Vec<f32>| {
            if fields.len() < 4 || fields[..4].iter().any(|f| !f.is_finite()) {
                return None;
            }
            Some(SensorPayload {
                rotation: OrientationSample::new(fields[0], fields[1], fields[2], fields[3]),
            })
        },
    )(s)
}

impl FromStr for SensorPayload {
    type Err = Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_payload(s.trim()).finish() {
            Ok((_remaining, payload)) => Ok(payload),
            Err(Error { input, code }) => Err(Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_quaternion() {
        let payload = SensorPayload::from_str("0.98,0.01,-0.12,0.15").unwrap();
        assert_eq!(
            payload.rotation(),
            OrientationSample::new(0.98, 0.01, -0.12, 0.15)
        );
    }

    #[test]
    fn tolerates_whitespace_and_newline() {
        let payload = SensorPayload::from_str(" 1.0, 0.0 ,0.0, 0.0\n").unwrap();
        assert_eq!(payload.rotation(), OrientationSample::IDENTITY);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let payload = SensorPayload::from_str("0.5,0.5,0.5,0.5,9.81,0.02").unwrap();
        assert_eq!(
            payload.rotation(),
            OrientationSample::new(0.5, 0.5, 0.5, 0.5)
        );
    }

    #[test]
    fn too_few_fields_is_an_error() {
        assert!(SensorPayload::from_str("0.98,0.01,-0.12").is_err());
    }

    #[test]
    fn non_numeric_is_an_error() {
        assert!(SensorPayload::from_str("ready").is_err());
        assert!(SensorPayload::from_str("w,x,y,z").is_err());
    }

    #[test]
    fn non_finite_component_is_an_error() {
        // 1e99 overflows f32 to infinity
        assert!(SensorPayload::from_str("1e99,0,0,0").is_err());
    }

    #[test]
    fn empty_is_an_error() {
        assert!(SensorPayload::from_str("").is_err());
        assert!(SensorPayload::from_str("\n").is_err());
    }
}
