//! Whole documents: the `VCALENDAR` wrapper around a list of incidences.

use std::collections::HashMap;

use chrono_tz::Tz as ChronoTz;

use crate::{
    component::{Incidence, IncidenceKind, parse_component, serialize_component},
    generator::Emitter,
    parser::{ComponentParser, ContentLine, OpaqueComponent, ParserError, RawComponent},
    types::{ChronoTzResolver, TzResolver},
    warning::{Warning, WarningKind, Warnings},
};

mod relations;
pub use relations::*;

mod storage;
pub use storage::*;

pub(crate) const CALENDAR: &str = "VCALENDAR";
const TIMEZONE: &str = "VTIMEZONE";
const VERSION: &str = "2.0";

/// Wrapper properties of which a merged document keeps one.
const SINGLE_PROPERTIES: [&str; 4] = ["PRODID", "VERSION", "CALSCALE", "METHOD"];

#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Written as `PRODID` on serialization.
    pub product_id: String,
    /// Resolve `TZID`s through the document's own `VTIMEZONE` definitions
    /// before asking the resolver.
    pub use_document_timezones: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            product_id: concat!("-//calcodec//calcodec ", env!("CARGO_PKG_VERSION"), "//EN")
                .to_owned(),
            use_document_timezones: true,
        }
    }
}

/// Everything in a document besides the incidences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarWrapper {
    /// Calendar-level properties such as `CALSCALE`, `METHOD` or `X-WR-CALNAME`.
    pub properties: Vec<ContentLine>,
    pub timezones: Vec<OpaqueComponent>,
    /// Top-level components that are not incidences, e.g. `VFREEBUSY`.
    pub other_components: Vec<OpaqueComponent>,
}

impl CalendarWrapper {
    pub fn get_property(&self, name: &str) -> Option<&ContentLine> {
        self.properties.iter().find(|prop| prop.name == name)
    }

    /// Adds a wrapper property. Single-valued properties replace an earlier
    /// one of the same name.
    pub fn set_property(&mut self, prop: ContentLine) {
        let single = SINGLE_PROPERTIES.contains(&prop.name.as_str());
        match self.properties.iter_mut().find(|old| old.name == prop.name) {
            Some(old) if single => *old = prop,
            _ => self.properties.push(prop),
        }
    }

    /// Adds a timezone definition, replacing one with the same `TZID`.
    pub fn set_timezone(&mut self, timezone: OpaqueComponent) {
        let tzid = timezone.get_property("TZID").map(|prop| prop.value.clone());
        let existing = self
            .timezones
            .iter_mut()
            .find(|old| old.get_property("TZID").map(|prop| &prop.value) == tzid.as_ref());
        match existing {
            Some(old) if tzid.is_some() => *old = timezone,
            _ => self.timezones.push(timezone),
        }
    }

    /// Merges `other` into `self`, `other` winning on conflicts.
    pub fn merge(&mut self, other: CalendarWrapper) {
        for prop in other.properties {
            self.set_property(prop);
        }
        for timezone in other.timezones {
            self.set_timezone(timezone);
        }
        self.other_components.extend(other.other_components);
    }
}

/// Result of parsing a document.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// Incidences in document order, one per UID.
    pub incidences: Vec<Incidence>,
    pub warnings: Vec<Warning>,
    /// Parent/child links between `incidences`, by index.
    pub relations: Relations,
    pub wrapper: CalendarWrapper,
}

impl ParsedDocument {
    fn position(&self, uid: &str) -> Option<usize> {
        self.incidences.iter().position(|incidence| incidence.uid == uid)
    }

    pub fn find(&self, uid: &str) -> Option<&Incidence> {
        self.position(uid).map(|index| &self.incidences[index])
    }

    pub fn children_of(&self, uid: &str) -> Vec<&Incidence> {
        self.position(uid)
            .map(|index| {
                self.relations
                    .children_of(index)
                    .iter()
                    .map(|child| &self.incidences[*child])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parent_of(&self, uid: &str) -> Option<&Incidence> {
        let index = self.position(uid)?;
        self.relations
            .parent_of(index)
            .map(|parent| &self.incidences[parent])
    }
}

/// Incidence blocks of a document, assembled but not yet deduplicated.
pub(crate) struct Assembled {
    /// Each incidence with the line of its `BEGIN`.
    pub incidences: Vec<(usize, Incidence)>,
    /// Incidence components found, including the ones that were dropped.
    pub incidence_blocks: usize,
    pub wrapper: CalendarWrapper,
    pub warnings: Warnings,
}

/// Resolves zones defined in the document first, then asks the caller's
/// resolver.
pub(crate) struct DocumentResolver<'a> {
    defined: HashMap<String, ChronoTz>,
    fallback: &'a dyn TzResolver,
}

impl<'a> DocumentResolver<'a> {
    pub fn new(fallback: &'a dyn TzResolver) -> Self {
        Self {
            defined: HashMap::new(),
            fallback,
        }
    }

    /// Learns the zone of a `VTIMEZONE` from its `X-LIC-LOCATION` or `TZID`.
    pub fn define(&mut self, timezone: &RawComponent) {
        let Some(tzid) = timezone.get_property("TZID") else {
            return;
        };
        let tzid = tzid.content.value.trim();
        let tz = timezone
            .get_property("X-LIC-LOCATION")
            .and_then(|location| self.fallback.resolve(location.content.value.trim()))
            .or_else(|| self.fallback.resolve(tzid));
        if let Some(tz) = tz {
            self.defined.insert(tzid.to_owned(), tz);
        }
    }
}

impl TzResolver for DocumentResolver<'_> {
    fn resolve(&self, tzid: &str) -> Option<ChronoTz> {
        self.defined
            .get(tzid)
            .copied()
            .or_else(|| self.fallback.resolve(tzid))
    }
}

/// Converts between documents and incidences.
///
/// The transcoder holds no state besides its configuration; every call is
/// independent.
#[derive(Debug, Clone, Default)]
pub struct Transcoder<R: TzResolver = ChronoTzResolver> {
    resolver: R,
    options: CodecOptions,
}

impl<R: TzResolver> Transcoder<R> {
    pub fn new(resolver: R, options: CodecOptions) -> Self {
        Self { resolver, options }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn parse_document(&self, input: &str) -> Result<ParsedDocument, ParserError> {
        self.parse_document_bytes(input.as_bytes())
    }

    /// Parses a document into its incidences.
    ///
    /// Broken components are dropped with a warning. A later component with
    /// the UID of an earlier one replaces it in place. Fails only if the
    /// input is not a `VCALENDAR` document at all.
    #[tracing::instrument(skip_all, fields(len = input.len()))]
    pub fn parse_document_bytes(&self, input: &[u8]) -> Result<ParsedDocument, ParserError> {
        let Assembled {
            incidences: assembled,
            wrapper,
            mut warnings,
            ..
        } = self.assemble(input)?;

        let mut incidences: Vec<Incidence> = Vec::with_capacity(assembled.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        for (line, incidence) in assembled {
            match index.get(&incidence.uid) {
                Some(&slot) => {
                    warnings.push(Warning {
                        uid: Some(incidence.uid.clone()),
                        ..Warning::new(Some(line), WarningKind::DuplicateUid)
                    });
                    incidences[slot] = incidence;
                }
                None => {
                    index.insert(incidence.uid.clone(), incidences.len());
                    incidences.push(incidence);
                }
            }
        }

        let relations = Relations::build(&incidences, &index, &mut warnings);
        tracing::debug!(
            incidences = incidences.len(),
            warnings = warnings.len(),
            "parsed document"
        );
        Ok(ParsedDocument {
            incidences,
            warnings: warnings.into_vec(),
            relations,
            wrapper,
        })
    }

    /// Splits a document into wrapper parts and assembled incidences.
    pub(crate) fn assemble(&self, input: &[u8]) -> Result<Assembled, ParserError> {
        let mut roots = vec![];
        for root in ComponentParser::from_slice(input) {
            let root = root?;
            if root.name != CALENDAR {
                return Err(ParserError::MissingHeader(CALENDAR));
            }
            roots.push(root);
        }
        if roots.is_empty() {
            return Err(ParserError::EmptyInput);
        }

        let mut resolver = DocumentResolver::new(&self.resolver);
        if self.options.use_document_timezones {
            roots
                .iter()
                .flat_map(|root| &root.children)
                .filter(|child| child.name == TIMEZONE && child.defect.is_none())
                .for_each(|timezone| resolver.define(timezone));
        }

        let mut assembled = Assembled {
            incidences: vec![],
            incidence_blocks: 0,
            wrapper: CalendarWrapper::default(),
            warnings: Warnings::default(),
        };
        for root in &roots {
            if let Some(defect) = &root.defect {
                assembled.warnings.push(Warning::new(
                    Some(root.line),
                    WarningKind::LineSkipped(defect.clone()),
                ));
            }
            for (line, error) in &root.skipped {
                assembled.warnings.push(Warning::new(
                    Some(*line),
                    WarningKind::LineSkipped(error.clone()),
                ));
            }
            for prop in &root.properties {
                assembled.wrapper.set_property(prop.content.clone());
            }
            for child in &root.children {
                self.assemble_child(child, &resolver, &mut assembled);
            }
        }
        Ok(assembled)
    }

    fn assemble_child(&self, child: &RawComponent, resolver: &dyn TzResolver, out: &mut Assembled) {
        if IncidenceKind::from_component_name(&child.name).is_some() {
            out.incidence_blocks += 1;
            match parse_component(child, resolver, &mut out.warnings) {
                Ok(incidence) => out.incidences.push((child.line, incidence)),
                Err(error) => out.warnings.push(Warning {
                    uid: child
                        .get_property("UID")
                        .map(|prop| prop.content.value.clone()),
                    ..Warning::new(
                        Some(child.line),
                        WarningKind::ComponentDropped {
                            component: child.name.clone(),
                            error,
                        },
                    )
                }),
            }
            return;
        }
        if let Some(error) = &child.defect {
            out.warnings.push(Warning::new(
                Some(child.line),
                WarningKind::ComponentDropped {
                    component: child.name.clone(),
                    error: error.clone(),
                },
            ));
            return;
        }
        for (line, error) in child.skipped_lines() {
            out.warnings.push(Warning::new(
                Some(*line),
                WarningKind::LineSkipped(error.clone()),
            ));
        }
        match child.name.as_str() {
            TIMEZONE => out.wrapper.set_timezone(child.to_opaque()),
            _ => out.wrapper.other_components.push(child.to_opaque()),
        }
    }

    /// Serializes incidences into a document, in the order given.
    pub fn serialize_document(&self, incidences: &[Incidence]) -> String {
        self.serialize_wrapped(&CalendarWrapper::default(), incidences)
    }

    /// Serializes incidences inside `wrapper`. `PRODID` and `VERSION` are
    /// always written fresh.
    #[tracing::instrument(skip_all, fields(incidences = incidences.len()))]
    pub fn serialize_wrapped(&self, wrapper: &CalendarWrapper, incidences: &[Incidence]) -> String {
        let mut properties = vec![
            ContentLine::new("PRODID", self.options.product_id.as_str()),
            ContentLine::new("VERSION", VERSION),
        ];
        properties.extend(
            wrapper
                .properties
                .iter()
                .filter(|prop| prop.name != "PRODID" && prop.name != "VERSION")
                .cloned(),
        );

        let mut children = wrapper.timezones.clone();
        children.extend(incidences.iter().map(serialize_component));
        children.extend(wrapper.other_components.iter().cloned());

        OpaqueComponent {
            name: CALENDAR.to_owned(),
            properties,
            children,
        }
        .generate()
    }
}
