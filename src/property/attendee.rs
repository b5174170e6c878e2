use crate::{
    parser::{ContentLine, ContentLineParams},
    types::ValueError,
};

const MAILTO: &str = "mailto:";

/// Parameters mapped onto [`Attendee`] fields. Everything else is kept in
/// [`Attendee::params`].
const KNOWN_PARAMS: [&str; 6] = [
    "CN",
    "ROLE",
    "PARTSTAT",
    "RSVP",
    "DELEGATED-FROM",
    "DELEGATED-TO",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    Chair,
    #[default]
    ReqParticipant,
    OptParticipant,
    NonParticipant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chair => "CHAIR",
            Self::ReqParticipant => "REQ-PARTICIPANT",
            Self::OptParticipant => "OPT-PARTICIPANT",
            Self::NonParticipant => "NON-PARTICIPANT",
        }
    }

    /// Unknown roles are read as [`Role::ReqParticipant`].
    fn from_param(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "CHAIR" => Self::Chair,
            "OPT-PARTICIPANT" => Self::OptParticipant,
            "NON-PARTICIPANT" => Self::NonParticipant,
            _ => Self::ReqParticipant,
        }
    }
}

/// Participation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PartStat {
    #[default]
    NeedsAction,
    Accepted,
    Declined,
    Tentative,
    Delegated,
    Completed,
    InProcess,
}

impl PartStat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsAction => "NEEDS-ACTION",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Tentative => "TENTATIVE",
            Self::Delegated => "DELEGATED",
            Self::Completed => "COMPLETED",
            Self::InProcess => "IN-PROCESS",
        }
    }

    /// Unknown values are read as [`PartStat::NeedsAction`].
    fn from_param(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "ACCEPTED" => Self::Accepted,
            "DECLINED" => Self::Declined,
            "TENTATIVE" => Self::Tentative,
            "DELEGATED" => Self::Delegated,
            "COMPLETED" => Self::Completed,
            "IN-PROCESS" => Self::InProcess,
            _ => Self::NeedsAction,
        }
    }
}

/// A calendar user, used for both `ATTENDEE` and `ORGANIZER`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attendee {
    pub name: Option<String>,
    /// Address without the `mailto:` scheme. Addresses with another scheme
    /// (e.g. `urn:uuid:`) are kept whole.
    pub email: String,
    pub role: Role,
    pub status: PartStat,
    pub rsvp: bool,
    pub delegated_from: Vec<String>,
    pub delegated_to: Vec<String>,
    /// Parameters without a dedicated field, e.g. `CUTYPE` or `SENT-BY`.
    pub params: ContentLineParams,
}

impl Attendee {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn from_content_line(prop: &ContentLine) -> Result<Self, ValueError> {
        let value = prop.value.trim();
        let email = match value.get(..MAILTO.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(MAILTO) => &value[MAILTO.len()..],
            _ => value,
        };
        if email.is_empty() {
            return Err(ValueError::malformed("CAL-ADDRESS", &prop.value));
        }
        let rsvp = match prop.params.get_param("RSVP") {
            None => false,
            Some(value) if value.eq_ignore_ascii_case("TRUE") => true,
            Some(value) if value.eq_ignore_ascii_case("FALSE") => false,
            Some(value) => return Err(ValueError::malformed("RSVP", value)),
        };

        let mut attendee = Self {
            name: prop.params.get_param("CN").map(str::to_owned),
            email: email.to_owned(),
            role: prop
                .params
                .get_param("ROLE")
                .map(Role::from_param)
                .unwrap_or_default(),
            status: prop
                .params
                .get_param("PARTSTAT")
                .map(PartStat::from_param)
                .unwrap_or_default(),
            rsvp,
            ..Default::default()
        };
        for (name, values) in prop.params.iter() {
            match name {
                "DELEGATED-FROM" => attendee.delegated_from.extend_from_slice(values),
                "DELEGATED-TO" => attendee.delegated_to.extend_from_slice(values),
                _ if KNOWN_PARAMS.contains(&name) => {}
                _ => attendee.params.0.push((name.to_owned(), values.to_vec())),
            }
        }
        Ok(attendee)
    }

    /// Builds the content line. Defaults are left out, so an organizer
    /// carries only its name.
    pub fn to_content_line(&self, name: &str) -> ContentLine {
        let mut params = ContentLineParams::default();
        if let Some(cn) = &self.name {
            params = params.with("CN", cn);
        }
        if self.role != Role::default() {
            params = params.with("ROLE", self.role.as_str());
        }
        if self.status != PartStat::default() {
            params = params.with("PARTSTAT", self.status.as_str());
        }
        if self.rsvp {
            params = params.with("RSVP", "TRUE");
        }
        if !self.delegated_from.is_empty() {
            params
                .0
                .push(("DELEGATED-FROM".to_owned(), self.delegated_from.clone()));
        }
        if !self.delegated_to.is_empty() {
            params
                .0
                .push(("DELEGATED-TO".to_owned(), self.delegated_to.clone()));
        }
        params.0.extend(self.params.0.iter().cloned());

        ContentLine::new(name, self.uri()).with_params(params)
    }

    /// The calendar address, with `mailto:` unless the address has a scheme.
    pub fn uri(&self) -> String {
        if has_scheme(&self.email) {
            self.email.clone()
        } else {
            format!("{MAILTO}{}", self.email)
        }
    }
}

fn has_scheme(address: &str) -> bool {
    match address.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && !scheme.contains('@')
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}
