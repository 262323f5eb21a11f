//! Fixed intake vocabularies collected over SMS.
//!
//! Each enum mirrors the exact option list offered in the corresponding
//! prompt; `as_str` returns the display form stored in the database and
//! forwarded to the field-service system.

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectType {
    EmergencyMitigation,
    Mold,
    Reconstruction,
    Sewage,
    Biohazard,
    Contents,
    Vandalism,
}

impl ProjectType {
    pub const ALL: [Self; 7] = [
        Self::EmergencyMitigation,
        Self::Mold,
        Self::Reconstruction,
        Self::Sewage,
        Self::Biohazard,
        Self::Contents,
        Self::Vandalism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmergencyMitigation => "Emergency Mitigation Services",
            Self::Mold => "Mold",
            Self::Reconstruction => "Reconstruction",
            Self::Sewage => "Sewage",
            Self::Biohazard => "Biohazard",
            Self::Contents => "Contents",
            Self::Vandalism => "Vandalism",
        }
    }

    pub fn from_menu_digit(digit: u8) -> Option<Self> {
        Self::ALL.get(usize::from(digit).checked_sub(1)?).copied()
    }
}

impl std::str::FromStr for ProjectType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|candidate| candidate.as_str() == value)
            .copied()
            .ok_or_else(|| DomainError::unknown("project type", value))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Residential,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Residential => "Residential",
            Self::Commercial => "Commercial",
        }
    }
}

impl std::str::FromStr for PropertyType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Residential" => Ok(Self::Residential),
            "Commercial" => Ok(Self::Commercial),
            other => Err(DomainError::unknown("property type", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResidentialSubtype {
    SingleFamily,
    MultiFamily,
    Manufactured,
}

impl ResidentialSubtype {
    pub const ALL: [Self; 3] = [Self::SingleFamily, Self::MultiFamily, Self::Manufactured];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleFamily => "Single Family Home",
            Self::MultiFamily => "Multi-Family Home",
            Self::Manufactured => "Manufactured Home",
        }
    }

    pub fn from_menu_digit(digit: u8) -> Option<Self> {
        Self::ALL.get(usize::from(digit).checked_sub(1)?).copied()
    }
}

impl std::str::FromStr for ResidentialSubtype {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|candidate| candidate.as_str() == value)
            .copied()
            .ok_or_else(|| DomainError::unknown("residential subtype", value))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferralSource {
    CustomerReferral,
    IndustryPartner,
    InsuranceReferral,
    LeadGen,
    OnlineMarketing,
    Plumber,
}

impl ReferralSource {
    pub const ALL: [Self; 6] = [
        Self::CustomerReferral,
        Self::IndustryPartner,
        Self::InsuranceReferral,
        Self::LeadGen,
        Self::OnlineMarketing,
        Self::Plumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerReferral => "Customer Referral",
            Self::IndustryPartner => "Industry Partner",
            Self::InsuranceReferral => "Insurance Referral",
            Self::LeadGen => "Lead Gen",
            Self::OnlineMarketing => "Online Marketing",
            Self::Plumber => "Plumber",
        }
    }

    pub fn from_menu_digit(digit: u8) -> Option<Self> {
        Self::ALL.get(usize::from(digit).checked_sub(1)?).copied()
    }
}

impl std::str::FromStr for ReferralSource {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|candidate| candidate.as_str() == value)
            .copied()
            .ok_or_else(|| DomainError::unknown("referral source", value))
    }
}
