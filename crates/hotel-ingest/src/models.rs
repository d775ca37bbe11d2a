//! Typed records for the two import kinds
//!
//! Each source row is parsed exactly once into a `HotelRecord` or
//! `ReviewRecord`. Once its foreign keys are resolved it becomes a `NewHotel`
//! or `NewReview`, the shape the datastore persists.

use crate::source::RawRecord;
use crate::validation::{self, RowRejection};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Source Columns
// ============================================================================

pub mod hotel_columns {
    pub const GLOBAL_PROPERTY_ID: &str = "Global Property ID";
    pub const SOURCE_PROPERTY_ID: &str = "Source Property ID";
    pub const GLOBAL_PROPERTY_NAME: &str = "Global Property Name";
    pub const GLOBAL_CHAIN_CODE: &str = "Global Chain Code";
    pub const ADDRESS_1: &str = "Property Address 1";
    pub const ADDRESS_2: &str = "Property Address 2";
    pub const PRIMARY_AIRPORT_CODE: &str = "Primary Airport Code";
    pub const CITY_NAME: &str = "Property City Name";
    pub const STATE_PROVINCE: &str = "Property State/Province";
    pub const ZIP_POSTAL: &str = "Property Zip/Postal";
    pub const COUNTRY_CODE: &str = "Property Country Code";
    pub const PHONE_NUMBER: &str = "Property Phone Number";
    pub const FAX_NUMBER: &str = "Property Fax Number";
    pub const SABRE_RATING: &str = "Sabre Property Rating";
    pub const LATITUDE: &str = "Property Latitude";
    pub const LONGITUDE: &str = "Property Longitude";
    pub const SOURCE_GROUP_CODE: &str = "Source Group Code";

    /// Required hotel columns, in the order they are checked
    pub const REQUIRED: &[&str] = &[
        GLOBAL_PROPERTY_ID,
        SOURCE_PROPERTY_ID,
        GLOBAL_PROPERTY_NAME,
        GLOBAL_CHAIN_CODE,
        ADDRESS_1,
        PRIMARY_AIRPORT_CODE,
        CITY_NAME,
        STATE_PROVINCE,
        ZIP_POSTAL,
        PHONE_NUMBER,
        SABRE_RATING,
        LATITUDE,
        LONGITUDE,
        SOURCE_GROUP_CODE,
    ];

    /// `VARCHAR` widths of the `hotels`, `cities` and `regions` columns
    pub mod width {
        pub const SOURCE_PROPERTY_ID: usize = 50;
        pub const NAME: usize = 100;
        pub const CODE: usize = 20;
        pub const CITY_NAME: usize = 100;
        pub const REGION_NAME: usize = 100;
        pub const COUNTRY: usize = 50;
        pub const CONTACT: usize = 30;
    }
}

pub mod review_columns {
    pub const HOTEL_NAME: &str = "HotelName";
    pub const REVIEWER_NAME: &str = "ReviewerName";
    pub const REVIEW_TITLE: &str = "ReviewTitle";
    pub const REVIEW_CONTENT: &str = "ReviewContent";
    pub const VALUE_RATING: &str = "ValueRating";
    pub const LOCATION_RATING: &str = "LocationRating";
    pub const SERVICE_RATING: &str = "ServiceRating";
    pub const ROOMS_RATING: &str = "RoomsRating";
    pub const CLEANLINESS_RATING: &str = "CleanlinessRating";
    pub const SLEEP_QUALITY_RATING: &str = "SleepQualityRating";

    /// Required review columns, in the order they are checked
    pub const REQUIRED: &[&str] = &[
        HOTEL_NAME,
        REVIEWER_NAME,
        REVIEW_TITLE,
        REVIEW_CONTENT,
        VALUE_RATING,
        LOCATION_RATING,
        SERVICE_RATING,
        ROOMS_RATING,
        CLEANLINESS_RATING,
        SLEEP_QUALITY_RATING,
    ];

    pub const REVIEWER_NAME_WIDTH: usize = 100;
    pub const REVIEW_TITLE_WIDTH: usize = 200;
}

// ============================================================================
// Natural Keys
// ============================================================================

/// City natural key: name plus country code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CityKey {
    pub name: String,
    pub country: String,
}

impl CityKey {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
        }
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.country)
    }
}

/// Region natural key: trimmed state/province name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionKey(pub String);

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hotel natural key used by the review import: trimmed property name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HotelKey(pub String);

impl fmt::Display for HotelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Hotels
// ============================================================================

/// A validated hotel row, before foreign key resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HotelRecord {
    pub global_property_id: i32,
    pub source_property_id: String,
    pub name: String,
    pub chain_code: String,
    pub address_1: String,
    pub address_2: Option<String>,
    pub airport_code: String,
    pub city_name: String,
    pub region_name: String,
    pub zip_postal: String,
    pub country_code: String,
    pub phone_number: String,
    pub fax_number: Option<String>,
    pub sabre_rating: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub source_group_code: String,
}

impl HotelRecord {
    /// Validate a raw hotel row.
    pub fn parse(row: &RawRecord) -> Result<Self, RowRejection> {
        use hotel_columns::{self as c, width};

        validation::require_fields(row, c::REQUIRED)?;

        let global_property_id = validation::integer(row, c::GLOBAL_PROPERTY_ID)?;
        let sabre_rating = validation::fixed_point(row, c::SABRE_RATING, 3, 1)?;
        let latitude = validation::fixed_point(row, c::LATITUDE, 9, 6)?;
        let longitude = validation::fixed_point(row, c::LONGITUDE, 9, 6)?;

        let text = |field: &'static str| validation::required(row, field).map(str::to_string);
        let short = |field: &'static str, max: usize| {
            validation::bounded(row, field, max).map(str::to_string)
        };
        let opt = |field: &'static str, max: usize| {
            validation::optional_bounded(row, field, max).map(|v| v.map(str::to_string))
        };

        Ok(Self {
            global_property_id,
            source_property_id: short(c::SOURCE_PROPERTY_ID, width::SOURCE_PROPERTY_ID)?,
            name: short(c::GLOBAL_PROPERTY_NAME, width::NAME)?,
            chain_code: short(c::GLOBAL_CHAIN_CODE, width::CODE)?,
            address_1: text(c::ADDRESS_1)?,
            address_2: validation::optional(row, c::ADDRESS_2).map(str::to_string),
            airport_code: short(c::PRIMARY_AIRPORT_CODE, width::CODE)?,
            city_name: short(c::CITY_NAME, width::CITY_NAME)?,
            region_name: short(c::STATE_PROVINCE, width::REGION_NAME)?,
            zip_postal: short(c::ZIP_POSTAL, width::CONTACT)?,
            country_code: opt(c::COUNTRY_CODE, width::COUNTRY)?.unwrap_or_default(),
            phone_number: short(c::PHONE_NUMBER, width::CONTACT)?,
            fax_number: opt(c::FAX_NUMBER, width::CONTACT)?,
            sabre_rating,
            latitude,
            longitude,
            source_group_code: short(c::SOURCE_GROUP_CODE, width::CODE)?,
        })
    }

    pub fn city_key(&self) -> CityKey {
        CityKey::new(&self.city_name, &self.country_code)
    }

    pub fn region_key(&self) -> RegionKey {
        RegionKey(self.region_name.clone())
    }

    /// Attach resolved surrogate ids.
    pub fn resolve(self, city_id: i32, region_id: i32) -> NewHotel {
        NewHotel {
            global_property_id: self.global_property_id,
            source_property_id: self.source_property_id,
            name: self.name,
            chain_code: self.chain_code,
            address_1: self.address_1,
            address_2: self.address_2,
            airport_code: self.airport_code,
            city_id,
            region_id,
            zip_postal: self.zip_postal,
            phone_number: self.phone_number,
            fax_number: self.fax_number,
            sabre_rating: self.sabre_rating,
            latitude: self.latitude,
            longitude: self.longitude,
            source_group_code: self.source_group_code,
        }
    }
}

/// Hotel row ready for the `hotels` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHotel {
    pub global_property_id: i32,
    pub source_property_id: String,
    pub name: String,
    pub chain_code: String,
    pub address_1: String,
    pub address_2: Option<String>,
    pub airport_code: String,
    pub city_id: i32,
    pub region_id: i32,
    pub zip_postal: String,
    pub phone_number: String,
    pub fax_number: Option<String>,
    pub sabre_rating: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub source_group_code: String,
}

// ============================================================================
// Reviews
// ============================================================================

/// The six review ratings, each in `[1.0, 5.0]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReviewRatings {
    pub value: f64,
    pub location: f64,
    pub service: f64,
    pub rooms: f64,
    pub cleanliness: f64,
    pub sleep_quality: f64,
}

/// A validated review row, before hotel resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub hotel_name: String,
    pub reviewer_name: String,
    pub title: String,
    pub content: String,
    pub ratings: ReviewRatings,
}

impl ReviewRecord {
    /// Validate a raw review row.
    pub fn parse(row: &RawRecord) -> Result<Self, RowRejection> {
        use review_columns as c;

        validation::require_fields(row, c::REQUIRED)?;

        let ratings = ReviewRatings {
            value: validation::rating(row, c::VALUE_RATING)?,
            location: validation::rating(row, c::LOCATION_RATING)?,
            service: validation::rating(row, c::SERVICE_RATING)?,
            rooms: validation::rating(row, c::ROOMS_RATING)?,
            cleanliness: validation::rating(row, c::CLEANLINESS_RATING)?,
            sleep_quality: validation::rating(row, c::SLEEP_QUALITY_RATING)?,
        };

        Ok(Self {
            hotel_name: validation::required(row, c::HOTEL_NAME)?.to_string(),
            reviewer_name: validation::bounded(row, c::REVIEWER_NAME, c::REVIEWER_NAME_WIDTH)?
                .to_string(),
            title: validation::bounded(row, c::REVIEW_TITLE, c::REVIEW_TITLE_WIDTH)?.to_string(),
            content: validation::required(row, c::REVIEW_CONTENT)?.to_string(),
            ratings,
        })
    }

    pub fn hotel_key(&self) -> HotelKey {
        HotelKey(self.hotel_name.clone())
    }

    pub fn resolve(self, global_property_id: i32) -> NewReview {
        NewReview {
            global_property_id,
            reviewer_name: self.reviewer_name,
            title: self.title,
            content: self.content,
            ratings: self.ratings,
        }
    }
}

/// Review row ready for the `reviews` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReview {
    pub global_property_id: i32,
    pub reviewer_name: String,
    pub title: String,
    pub content: String,
    pub ratings: ReviewRatings,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hotel_columns as h;
    use review_columns as r;

    fn hotel_row(overrides: &[(&'static str, &str)]) -> RawRecord {
        let mut fields: Vec<(&str, &str)> = vec![
            (h::GLOBAL_PROPERTY_ID, "1001"),
            (h::SOURCE_PROPERTY_ID, "SRC-1"),
            (h::GLOBAL_PROPERTY_NAME, "Hotel Lutetia"),
            (h::GLOBAL_CHAIN_CODE, "LX"),
            (h::ADDRESS_1, "45 Boulevard Raspail"),
            (h::ADDRESS_2, ""),
            (h::PRIMARY_AIRPORT_CODE, "CDG"),
            (h::CITY_NAME, "Paris"),
            (h::STATE_PROVINCE, " Ile-de-France "),
            (h::ZIP_POSTAL, "75006"),
            (h::COUNTRY_CODE, "FR"),
            (h::PHONE_NUMBER, "+33 1 49 54 46 00"),
            (h::FAX_NUMBER, ""),
            (h::SABRE_RATING, "4.5"),
            (h::LATITUDE, "48.851"),
            (h::LONGITUDE, "2.327"),
            (h::SOURCE_GROUP_CODE, "GRP"),
        ];
        for &(column, value) in overrides {
            if let Some(slot) = fields.iter_mut().find(|(name, _)| *name == column) {
                slot.1 = value;
            }
        }
        RawRecord::from_pairs(fields)
    }

    #[test]
    fn test_parse_hotel() {
        let hotel = HotelRecord::parse(&hotel_row(&[])).unwrap();
        assert_eq!(hotel.global_property_id, 1001);
        assert_eq!(hotel.address_2, None);
        assert_eq!(hotel.fax_number, None);
        assert_eq!(hotel.city_key().to_string(), "Paris|FR");
        assert_eq!(hotel.region_key(), RegionKey("Ile-de-France".to_string()));

        let resolved = hotel.resolve(7, 9);
        assert_eq!((resolved.city_id, resolved.region_id), (7, 9));
    }

    #[test]
    fn test_parse_hotel_missing_name() {
        let err = HotelRecord::parse(&hotel_row(&[(h::GLOBAL_PROPERTY_NAME, " ")])).unwrap_err();
        assert_eq!(err.reason(), "Missing required field: Global Property Name");
    }

    #[test]
    fn test_parse_hotel_country_optional() {
        let hotel = HotelRecord::parse(&hotel_row(&[(h::COUNTRY_CODE, "")])).unwrap();
        assert_eq!(hotel.city_key().to_string(), "Paris|");
    }

    #[test]
    fn test_parse_hotel_numeric_checks() {
        let err = HotelRecord::parse(&hotel_row(&[(h::GLOBAL_PROPERTY_ID, "abc")])).unwrap_err();
        assert_eq!(err.reason(), "Invalid Global Property ID (not a number)");

        let err = HotelRecord::parse(&hotel_row(&[(h::LONGITUDE, "east")])).unwrap_err();
        assert_eq!(err.reason(), "Invalid Property Longitude (not a number)");
    }

    #[test]
    fn test_parse_hotel_rejects_values_wider_than_columns() {
        let long_name = "N".repeat(101);
        let err = HotelRecord::parse(&hotel_row(&[(h::GLOBAL_PROPERTY_NAME, &long_name)])).unwrap_err();
        assert_eq!(err.reason(), "Invalid Global Property Name (too long)");

        let err = HotelRecord::parse(&hotel_row(&[(h::PRIMARY_AIRPORT_CODE, "AIRPORT-CODE-TOO-LONG")]))
            .unwrap_err();
        assert_eq!(err.reason(), "Invalid Primary Airport Code (too long)");

        let err = HotelRecord::parse(&hotel_row(&[(h::FAX_NUMBER, "+33 1 23 45 67 89 ext. 1234567890")]))
            .unwrap_err();
        assert_eq!(err.reason(), "Invalid Property Fax Number (too long)");

        // exactly at the width is accepted
        let exact = "N".repeat(100);
        let hotel = HotelRecord::parse(&hotel_row(&[(h::GLOBAL_PROPERTY_NAME, &exact)])).unwrap();
        assert_eq!(hotel.name, exact);
    }

    #[test]
    fn test_parse_hotel_rejects_numeric_overflow() {
        let err = HotelRecord::parse(&hotel_row(&[(h::LATITUDE, "1234.5")])).unwrap_err();
        assert_eq!(err.reason(), "Invalid Property Latitude (too large)");

        let err = HotelRecord::parse(&hotel_row(&[(h::SABRE_RATING, "150")])).unwrap_err();
        assert_eq!(err.reason(), "Invalid Sabre Property Rating (too large)");
    }

    fn review_row(value_rating: &str) -> RawRecord {
        RawRecord::from_pairs([
            (r::HOTEL_NAME, " Hotel Lutetia "),
            (r::REVIEWER_NAME, "Ana"),
            (r::REVIEW_TITLE, "Lovely"),
            (r::REVIEW_CONTENT, " Great stay. "),
            (r::VALUE_RATING, value_rating),
            (r::LOCATION_RATING, "5"),
            (r::SERVICE_RATING, "4.5"),
            (r::ROOMS_RATING, "4"),
            (r::CLEANLINESS_RATING, "5"),
            (r::SLEEP_QUALITY_RATING, "3.5"),
        ])
    }

    #[test]
    fn test_parse_review() {
        let review = ReviewRecord::parse(&review_row("4.0")).unwrap();
        assert_eq!(review.hotel_key(), HotelKey("Hotel Lutetia".to_string()));
        assert_eq!(review.content, "Great stay.");
        assert_eq!(review.ratings.sleep_quality, 3.5);
    }

    #[test]
    fn test_parse_review_rating_out_of_range() {
        let err = ReviewRecord::parse(&review_row("6.2")).unwrap_err();
        assert_eq!(err.reason(), "Invalid ValueRating (must be between 1.0 and 5.0)");
    }
}
