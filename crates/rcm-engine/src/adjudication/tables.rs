//! Fixed domain registries used by the domain checks and the advisory fallbacks.

use std::sync::OnceLock;

use regex::Regex;

pub const DEFAULT_APPROVAL_THRESHOLD: f64 = 250.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityType {
    DialysisCenter,
    MaternityHospital,
    CardiologyCenter,
    GeneralHospital,
}

impl FacilityType {
    pub const fn label(self) -> &'static str {
        match self {
            FacilityType::DialysisCenter => "DIALYSIS_CENTER",
            FacilityType::MaternityHospital => "MATERNITY_HOSPITAL",
            FacilityType::CardiologyCenter => "CARDIOLOGY_CENTER",
            FacilityType::GeneralHospital => "GENERAL_HOSPITAL",
        }
    }

    pub fn allowed_services(self) -> &'static [&'static str] {
        match self {
            FacilityType::MaternityHospital => &["SRV2008"],
            FacilityType::DialysisCenter => &["SRV1003", "SRV2010"],
            FacilityType::CardiologyCenter => &["SRV2001", "SRV2011"],
            FacilityType::GeneralHospital => &[
                "SRV1001", "SRV1002", "SRV1003", "SRV2001", "SRV2002", "SRV2003", "SRV2004",
                "SRV2006", "SRV2007", "SRV2008", "SRV2010", "SRV2011",
            ],
        }
    }

    pub fn allows(self, service: &str) -> bool {
        self.allowed_services().contains(&service)
    }
}

const FACILITIES: &[(&str, FacilityType)] = &[
    ("0DBYE6KP", FacilityType::DialysisCenter),
    ("2XKSZK4T", FacilityType::MaternityHospital),
    ("7R1VMIGX", FacilityType::CardiologyCenter),
    ("96GUDLMT", FacilityType::GeneralHospital),
    ("9V7HTI6E", FacilityType::GeneralHospital),
    ("EGVP0QAQ", FacilityType::GeneralHospital),
    ("EPRETQTL", FacilityType::DialysisCenter),
    ("FLXFBIMD", FacilityType::GeneralHospital),
    ("GLCTDQAJ", FacilityType::MaternityHospital),
    ("GY0GUI8G", FacilityType::GeneralHospital),
    ("I2MFYKYM", FacilityType::GeneralHospital),
    ("LB7I54Z7", FacilityType::CardiologyCenter),
    ("M1XCZVQD", FacilityType::CardiologyCenter),
    ("M7DJYNG5", FacilityType::GeneralHospital),
    ("MT5W4HIR", FacilityType::MaternityHospital),
    ("OCQUMGDW", FacilityType::GeneralHospital),
    ("OIAP2DTP", FacilityType::CardiologyCenter),
    ("Q3G9N34N", FacilityType::GeneralHospital),
    ("Q8OZ5Z7C", FacilityType::GeneralHospital),
    ("RNPGDXCU", FacilityType::MaternityHospital),
    ("S174K5QK", FacilityType::GeneralHospital),
    ("SKH7D31V", FacilityType::CardiologyCenter),
    ("SZC62NTW", FacilityType::GeneralHospital),
    ("VV1GS6P0", FacilityType::MaternityHospital),
    ("ZDE6M6NJ", FacilityType::GeneralHospital),
];

pub fn facility_type(facility_id: &str) -> Option<FacilityType> {
    FACILITIES
        .iter()
        .find(|(id, _)| *id == facility_id)
        .map(|(_, kind)| *kind)
}

pub const INPATIENT_ONLY_SERVICES: &[&str] = &["SRV1001", "SRV1002", "SRV1003"];

pub const OUTPATIENT_ONLY_SERVICES: &[&str] = &[
    "SRV2001", "SRV2002", "SRV2003", "SRV2004", "SRV2006", "SRV2007", "SRV2008", "SRV2010",
    "SRV2011",
];

pub const DIAGNOSIS_REQUIRED_SERVICE: &[(&str, &str)] = &[
    ("E11.9", "SRV2007"),
    ("J45.909", "SRV2006"),
    ("R07.9", "SRV2001"),
    ("Z34.0", "SRV2008"),
    ("N39.0", "SRV2005"),
];

pub const MUTUALLY_EXCLUSIVE_DIAGNOSES: &[(&str, &str)] = &[
    ("R73.03", "E11.9"),
    ("E66.9", "E66.3"),
    ("R51", "G43.9"),
];

pub const SERVICES_REQUIRING_APPROVAL: &[&str] = &["SRV1001", "SRV1002", "SRV2008"];

pub const DIAGNOSES_REQUIRING_APPROVAL: &[&str] = &["E11.9", "R07.9", "Z34.0"];

pub fn is_inpatient_only(service: &str) -> bool {
    INPATIENT_ONLY_SERVICES.contains(&service)
}

pub fn is_outpatient_only(service: &str) -> bool {
    OUTPATIENT_ONLY_SERVICES.contains(&service)
}

/// Inpatient-only services plus the whole `SRV1` series.
pub fn is_inpatient_typed(service: &str) -> bool {
    is_inpatient_only(service) || service.starts_with("SRV1")
}

pub fn service_requires_approval(service: &str) -> bool {
    SERVICES_REQUIRING_APPROVAL.contains(&service)
}

pub fn diagnosis_requires_approval(code: &str) -> bool {
    DIAGNOSES_REQUIRING_APPROVAL.contains(&code)
}

fn id_segment() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]+$").expect("identifier pattern compiles"))
}

/// Uppercase alphanumeric, at least one character.
pub fn is_id_segment(value: &str) -> bool {
    id_segment().is_match(value)
}

/// Three uppercase alphanumeric segments separated by hyphens.
pub fn is_unique_id(value: &str) -> bool {
    let segments: Vec<&str> = value.split('-').collect();
    segments.len() == 3 && segments.iter().all(|segment| is_id_segment(segment))
}
