//! Fixtures shared by the integration tests

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub const HOTEL_HEADER: &[&str] = &[
    "Global Property ID",
    "Source Property ID",
    "Global Property Name",
    "Global Chain Code",
    "Property Address 1",
    "Property Address 2",
    "Primary Airport Code",
    "Property City Name",
    "Property State/Province",
    "Property Zip/Postal",
    "Property Country Code",
    "Property Phone Number",
    "Property Fax Number",
    "Sabre Property Rating",
    "Property Latitude",
    "Property Longitude",
    "Source Group Code",
];

pub const REVIEW_HEADER: &[&str] = &[
    "HotelName",
    "ReviewerName",
    "ReviewTitle",
    "ReviewContent",
    "ValueRating",
    "LocationRating",
    "ServiceRating",
    "RoomsRating",
    "CleanlinessRating",
    "SleepQualityRating",
];

/// One hotel line in header order
pub fn hotel_line(id: &str, name: &str, city: &str, country: &str, region: &str) -> String {
    [
        id,
        &format!("SRC-{}", id),
        name,
        "CH",
        "1 Main Street",
        "",
        "AAA",
        city,
        region,
        "12345",
        country,
        "+1 555 0100",
        "",
        "4.0",
        "48.8566",
        "2.3522",
        "GRP",
    ]
    .join("\t")
}

/// One review line in header order
pub fn review_line(hotel: &str, reviewer: &str, title: &str, value_rating: &str) -> String {
    [hotel, reviewer, title, "\"Clean rooms, friendly staff\"", value_rating, "5", "4", "4", "5", "4.5"].join(",")
}

pub fn hotel_file(lines: &[String]) -> NamedTempFile {
    write_file(&HOTEL_HEADER.join("\t"), lines)
}

pub fn review_file(lines: &[String]) -> NamedTempFile {
    write_file(&REVIEW_HEADER.join(","), lines)
}

/// Append raw bytes, e.g. a line that is not valid UTF-8.
pub fn append_bytes(file: &mut NamedTempFile, bytes: &[u8]) {
    file.write_all(bytes).expect("append bytes");
    file.flush().expect("flush");
}

fn write_file(header: &str, lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    writeln!(file, "{}", header).expect("write header");
    for line in lines {
        writeln!(file, "{}", line).expect("write line");
    }
    file.flush().expect("flush");
    file
}
