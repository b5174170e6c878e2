use std::path::{Path, PathBuf};

use crate::{
    calendar::{CalendarWrapper, ParsedDocument, Transcoder},
    component::Incidence,
    parser::ParserError,
    types::{ChronoTzResolver, TzResolver},
    warning::Warning,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParserError,
    },
}

/// A calendar collection that owns its incidences and can be loaded from and
/// saved to a file.
#[derive(Debug, Default)]
pub struct Calendar<R: TzResolver = ChronoTzResolver> {
    transcoder: Transcoder<R>,
    incidences: Vec<Incidence>,
    wrapper: CalendarWrapper,
    warnings: Vec<Warning>,
    last_error: Option<StorageError>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: TzResolver> Calendar<R> {
    pub fn with_transcoder(transcoder: Transcoder<R>) -> Self {
        Self {
            transcoder,
            incidences: vec![],
            wrapper: CalendarWrapper::default(),
            warnings: vec![],
            last_error: None,
        }
    }

    pub fn incidences(&self) -> &[Incidence] {
        &self.incidences
    }

    pub fn incidence(&self, uid: &str) -> Option<&Incidence> {
        self.incidences.iter().find(|incidence| incidence.uid == uid)
    }

    pub fn incidence_mut(&mut self, uid: &str) -> Option<&mut Incidence> {
        self.incidences
            .iter_mut()
            .find(|incidence| incidence.uid == uid)
    }

    /// Adds an incidence, replacing one with the same UID in place. Returns
    /// the replaced incidence.
    pub fn add(&mut self, incidence: Incidence) -> Option<Incidence> {
        match self.incidence_mut(&incidence.uid) {
            Some(slot) => Some(std::mem::replace(slot, incidence)),
            None => {
                self.incidences.push(incidence);
                None
            }
        }
    }

    /// Removes an incidence. Children keep their `RELATED-TO`; re-parenting
    /// them is up to the caller.
    pub fn remove(&mut self, uid: &str) -> Option<Incidence> {
        let position = self
            .incidences
            .iter()
            .position(|incidence| incidence.uid == uid)?;
        Some(self.incidences.remove(position))
    }

    /// Incidences whose `RELATED-TO` names `uid`.
    pub fn children_of(&self, uid: &str) -> Vec<&Incidence> {
        self.incidences
            .iter()
            .filter(|incidence| incidence.related_to.as_deref() == Some(uid))
            .collect()
    }

    pub fn wrapper(&self) -> &CalendarWrapper {
        &self.wrapper
    }

    /// Warnings of the last successful load.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Why the last `load` or `save` returned `false`.
    pub fn last_error(&self) -> Option<&StorageError> {
        self.last_error.as_ref()
    }

    /// Merges a parsed document. Incoming incidences replace those with the
    /// same UID.
    pub fn merge(&mut self, document: ParsedDocument) {
        for incidence in document.incidences {
            self.add(incidence);
        }
        self.wrapper.merge(document.wrapper);
        self.warnings = document.warnings;
    }

    pub fn to_ics(&self) -> String {
        self.transcoder
            .serialize_wrapped(&self.wrapper, &self.incidences)
    }

    /// Reads `path` and merges it into the collection. On failure nothing
    /// is changed.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn try_load(&mut self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| StorageError::Io {
            path: path.to_owned(),
            source,
        })?;
        let document = self
            .transcoder
            .parse_document_bytes(&bytes)
            .map_err(|source| StorageError::Parse {
                path: path.to_owned(),
                source,
            })?;
        tracing::debug!(
            incidences = document.incidences.len(),
            warnings = document.warnings.len(),
            "loaded calendar"
        );
        self.merge(document);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn try_save(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_ics()).map_err(|source| StorageError::Io {
            path: path.to_owned(),
            source,
        })
    }

    /// Like [`Self::try_load`], reporting failure as `false`. The reason is
    /// kept in [`Self::last_error`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        let result = self.try_load(path);
        self.record(result)
    }

    /// Like [`Self::try_save`], reporting failure as `false`. The reason is
    /// kept in [`Self::last_error`].
    pub fn save(&mut self, path: impl AsRef<Path>) -> bool {
        let result = self.try_save(path);
        self.record(result)
    }

    fn record(&mut self, result: Result<(), StorageError>) -> bool {
        match result {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                tracing::error!("{err}");
                self.last_error = Some(err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const TODOS: &str = "BEGIN:VCALENDAR\r\nX-WR-CALNAME:Chores\r\nBEGIN:VTODO\r\nUID:t-1\r\nSUMMARY:Laundry\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";

    #[test_log::test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.ics");
        std::fs::write(&path, TODOS).unwrap();

        let mut calendar = Calendar::new();
        assert!(calendar.load(&path));
        assert_eq!(calendar.incidences().len(), 1);
        calendar.incidence_mut("t-1").unwrap().summary = Some("Ironing".to_owned());
        calendar.add(Incidence::new_event("e-1"));
        assert!(calendar.save(&path));

        let mut reloaded = Calendar::new();
        assert!(reloaded.load(&path));
        assert_eq!(reloaded.incidences(), calendar.incidences());
        assert_eq!(
            reloaded.wrapper().get_property("X-WR-CALNAME").unwrap().value,
            "Chores"
        );
    }

    #[test_log::test]
    fn failed_load_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.ics");
        let bad = dir.path().join("bad.ics");
        std::fs::write(&good, TODOS).unwrap();
        std::fs::write(&bad, "this is not a calendar").unwrap();

        let mut calendar = Calendar::new();
        assert!(calendar.load(&good));
        let before = calendar.incidences().to_vec();

        assert!(!calendar.load(&bad));
        assert!(matches!(
            calendar.last_error(),
            Some(StorageError::Parse { .. })
        ));
        assert!(!calendar.load(dir.path().join("missing.ics")));
        assert!(matches!(calendar.last_error(), Some(StorageError::Io { .. })));
        assert_eq!(calendar.incidences(), before.as_slice());

        assert!(calendar.load(&good));
        assert!(calendar.last_error().is_none());
    }

    #[test]
    fn load_merges_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("update.ics");
        std::fs::write(
            &path,
            "BEGIN:VCALENDAR\nBEGIN:VTODO\nUID:t-1\nPERCENT-COMPLETE:100\nEND:VTODO\nEND:VCALENDAR\n",
        )
        .unwrap();

        let mut calendar = Calendar::new();
        calendar.add(Incidence::new_todo("t-0"));
        calendar.add(Incidence::new_todo("t-1"));
        assert!(calendar.load(&path));

        let uids: Vec<_> = calendar.incidences().iter().map(|inc| inc.uid.as_str()).collect();
        assert_eq!(uids, vec!["t-0", "t-1"]);
        assert_eq!(
            calendar.incidence("t-1").unwrap().todo().unwrap().percent_complete,
            100
        );
    }

    #[test]
    fn children_and_removal() {
        let mut calendar = Calendar::new();
        let mut child = Incidence::new_todo("child");
        child.related_to = Some("parent".to_owned());
        calendar.add(Incidence::new_todo("parent"));
        calendar.add(child);

        assert_eq!(calendar.children_of("parent")[0].uid, "child");
        assert!(calendar.remove("parent").is_some());
        assert!(calendar.remove("parent").is_none());
        assert_eq!(
            calendar.incidence("child").unwrap().related_to.as_deref(),
            Some("parent")
        );
    }
}
