//! Marketplaces and the regional endpoints that serve them.

use std::fmt;
use std::str::FromStr;

/// Selling Partner API region; each has its own production and sandbox host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    NorthAmerica,
    Europe,
    FarEast,
}

impl Region {
    pub fn endpoint(self) -> &'static str {
        match self {
            Region::NorthAmerica => "https://sellingpartnerapi-na.amazon.com",
            Region::Europe => "https://sellingpartnerapi-eu.amazon.com",
            Region::FarEast => "https://sellingpartnerapi-fe.amazon.com",
        }
    }

    pub fn sandbox_endpoint(self) -> &'static str {
        match self {
            Region::NorthAmerica => "https://sandbox.sellingpartnerapi-na.amazon.com",
            Region::Europe => "https://sandbox.sellingpartnerapi-eu.amazon.com",
            Region::FarEast => "https://sandbox.sellingpartnerapi-fe.amazon.com",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Marketplace {
    #[default]
    US,
    CA,
    MX,
    BR,
    UK,
    DE,
    FR,
    IT,
    ES,
    NL,
    SE,
    PL,
    BE,
    TR,
    AE,
    SA,
    EG,
    IN,
    JP,
    AU,
    SG,
}

impl Marketplace {
    /// Marketplace identifier as used in `marketplaceIds` parameters.
    pub fn id(self) -> &'static str {
        match self {
            Marketplace::US => "ATVPDKIKX0DER",
            Marketplace::CA => "A2EUQ1WTGCTBG2",
            Marketplace::MX => "A1AM78C64UM0Y8",
            Marketplace::BR => "A2Q3Y263D00KWC",
            Marketplace::UK => "A1F83G8C2ARO7P",
            Marketplace::DE => "A1PA6795UKMFR9",
            Marketplace::FR => "A13V1IB3VIYZZH",
            Marketplace::IT => "APJ6JRA9NG5V4",
            Marketplace::ES => "A1RKKUPIHCS9HS",
            Marketplace::NL => "A1805IZSGTT6HS",
            Marketplace::SE => "A2NODRKZP88ZB9",
            Marketplace::PL => "A1C3SOZRARQ6R3",
            Marketplace::BE => "AMEN7PMS3EDWL",
            Marketplace::TR => "A33AVAJ2PDY3EV",
            Marketplace::AE => "A2VIGQ35RCS4UG",
            Marketplace::SA => "A17E79C6D8DWNP",
            Marketplace::EG => "ARBP9OOSHTCHU",
            Marketplace::IN => "A21TJRUUN4KGV",
            Marketplace::JP => "A1VC38T7YXB528",
            Marketplace::AU => "A39IBJ37TRP1C6",
            Marketplace::SG => "A19VAU5U5O7RUS",
        }
    }

    pub fn region(self) -> Region {
        match self {
            Marketplace::US | Marketplace::CA | Marketplace::MX | Marketplace::BR => {
                Region::NorthAmerica
            }
            Marketplace::JP | Marketplace::AU | Marketplace::SG => Region::FarEast,
            _ => Region::Europe,
        }
    }

    pub fn endpoint(self) -> &'static str {
        self.region().endpoint()
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Marketplace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let marketplace = match s.to_ascii_uppercase().as_str() {
            "US" => Marketplace::US,
            "CA" => Marketplace::CA,
            "MX" => Marketplace::MX,
            "BR" => Marketplace::BR,
            "UK" | "GB" => Marketplace::UK,
            "DE" => Marketplace::DE,
            "FR" => Marketplace::FR,
            "IT" => Marketplace::IT,
            "ES" => Marketplace::ES,
            "NL" => Marketplace::NL,
            "SE" => Marketplace::SE,
            "PL" => Marketplace::PL,
            "BE" => Marketplace::BE,
            "TR" => Marketplace::TR,
            "AE" => Marketplace::AE,
            "SA" => Marketplace::SA,
            "EG" => Marketplace::EG,
            "IN" => Marketplace::IN,
            "JP" => Marketplace::JP,
            "AU" => Marketplace::AU,
            "SG" => Marketplace::SG,
            other => return Err(format!("unknown marketplace '{other}'")),
        };
        Ok(marketplace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_of_marketplace() {
        assert_eq!(Marketplace::US.region(), Region::NorthAmerica);
        assert_eq!(Marketplace::DE.region(), Region::Europe);
        assert_eq!(Marketplace::IN.region(), Region::Europe);
        assert_eq!(Marketplace::JP.region(), Region::FarEast);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            Marketplace::UK.endpoint(),
            "https://sellingpartnerapi-eu.amazon.com"
        );
        assert_eq!(
            Region::FarEast.sandbox_endpoint(),
            "https://sandbox.sellingpartnerapi-fe.amazon.com"
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("us".parse::<Marketplace>().unwrap(), Marketplace::US);
        assert_eq!("GB".parse::<Marketplace>().unwrap(), Marketplace::UK);
        assert!("XX".parse::<Marketplace>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let m = Marketplace::SG;
        assert_eq!(m.to_string().parse::<Marketplace>().unwrap(), m);
        assert_eq!(m.id(), "A19VAU5U5O7RUS");
    }
}
