//! The field walker.
//!
//! Walks a destination's fields in declaration order and assigns values from
//! a [`FieldSource`] (and, for multipart bodies, a [`FileSource`]) under one
//! source's tag key. Rules per field, in order:
//!
//! 1. embedded record with an explicit name: ambiguous, rejected
//! 2. embedded record without a name: allocated if optional, then walked
//! 3. read-only field: skipped
//! 4. no name for this source: walked if it is a record, otherwise skipped
//! 5. file-shaped field with a file source: assigned from uploads
//! 6. name looked up exactly, then ignoring case; absent keys are skipped
//! 7. multi-value decoder, then single-value decoder, then optional
//!    unwrapping, then sequence building, then primitive coercion

use crate::coerce::ConversionError;
use crate::error::Failure;
use crate::field::{Kind, Shape, Slot};
use crate::record::{Bindable, Destination, FieldDescriptor, MapTarget, TagKey, Target};
use crate::source::{FieldSource, FileSource, UploadedFile};

/// Binds one source into a destination.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use request_binder::{FieldSource, TagKey, Walker};
///
/// let mut values = FieldSource::new();
/// values.append("lang", "en".to_string());
/// values.append("lang", "de".to_string());
///
/// let mut langs: HashMap<String, Vec<String>> = HashMap::new();
/// Walker::new(TagKey::Query, &values).bind(&mut langs).unwrap();
///
/// assert_eq!(langs["lang"], vec!["en", "de"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    tag: TagKey,
    values: &'a FieldSource,
    files: Option<&'a FileSource>,
}

impl<'a> Walker<'a> {
    /// Creates a walker reading `values` under `tag`.
    pub fn new(tag: TagKey, values: &'a FieldSource) -> Self {
        Self {
            tag,
            values,
            files: None,
        }
    }

    /// Adds uploaded files, consulted for file-shaped fields.
    pub fn with_files(mut self, files: &'a FileSource) -> Self {
        self.files = Some(files);
        self
    }

    /// Tag key this walker reads.
    pub fn tag(&self) -> TagKey {
        self.tag
    }

    /// Binds into any destination root.
    ///
    /// Records are walked, string-keyed maps are filled. Other roots are
    /// skipped, except under the form tag where they are an
    /// [`Failure::InvalidDestination`].
    ///
    /// # Errors
    ///
    /// Returns the first field failure; fields bound before it stay bound.
    pub fn bind<D: Destination + ?Sized>(&self, destination: &mut D) -> Result<(), Failure> {
        match destination.target() {
            Target::Record(record) => record.bind_with(self),
            Target::Map(map) => {
                self.fill_map(map);
                Ok(())
            }
            Target::Unsupported if self.tag == TagKey::Form => Err(Failure::InvalidDestination {
                reason: "binding element must be a record or a string-keyed map".to_string(),
            }),
            Target::Unsupported => {
                tracing::trace!(tag = %self.tag, "destination has no bindable fields, skipping");
                Ok(())
            }
        }
    }

    /// Walks every field of `record`.
    ///
    /// # Errors
    ///
    /// Returns the first field failure; fields bound before it stay bound.
    pub fn walk<T: Bindable>(&self, record: &mut T) -> Result<(), Failure> {
        for field in T::fields() {
            self.bind_field(field, record)?;
        }
        Ok(())
    }

    fn bind_field<T>(&self, field: &FieldDescriptor<T>, record: &mut T) -> Result<(), Failure> {
        let external = field.tag(self.tag);
        let slot = field.get_mut(record).slot();
        let shape = slot.shape();

        if field.is_embedded() && shape.is_record() {
            return match external {
                Some("") => Ok(()),
                Some(_) => Err(Failure::AmbiguousMapping {
                    field: field.name(),
                    reason: "embedded records cannot carry an external name",
                }),
                None if field.is_read_only() => Ok(()),
                None => self.walk_embedded(slot),
            };
        }

        if field.is_read_only() {
            return Ok(());
        }

        let Some(external) = external else {
            if let Slot::Record(nested) = slot {
                return nested.bind_with(self);
            }
            return Ok(());
        };
        if external.is_empty() {
            return Ok(());
        }

        if let Some(files) = self.files {
            match shape {
                Shape::Bare(Kind::File) => {
                    return Err(Failure::AmbiguousMapping {
                        field: field.name(),
                        reason: "a bare UploadedFile cannot express absence, use Option or Vec",
                    });
                }
                Shape::Optional(Kind::File)
                | Shape::Sequence(Kind::File)
                | Shape::OptionalSequence(Kind::File)
                | Shape::SequenceOfOptional(Kind::File) => {
                    let Some(uploads) = files.get(external) else {
                        tracing::trace!(field = field.name(), key = external, "no uploaded file");
                        return Ok(());
                    };
                    tracing::trace!(
                        field = field.name(),
                        key = external,
                        files = uploads.len(),
                        "binding uploaded files"
                    );
                    return assign_files(slot, uploads).map_err(|source| Failure::Conversion {
                        field: external.to_string(),
                        source,
                    });
                }
                _ => {}
            }
        }

        let Some(values) = self.values.lookup(external) else {
            tracing::trace!(field = field.name(), key = external, "no value supplied");
            return Ok(());
        };
        tracing::trace!(
            field = field.name(),
            key = external,
            values = values.len(),
            "binding field"
        );
        assign(slot, values).map_err(|source| Failure::Conversion {
            field: external.to_string(),
            source,
        })
    }

    fn walk_embedded(&self, slot: Slot<'_>) -> Result<(), Failure> {
        match slot {
            Slot::Record(record) => record.bind_with(self),
            Slot::Optional(optional) => match optional.allocate() {
                Slot::Record(record) => record.bind_with(self),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }

    fn fill_map(&self, map: MapTarget<'_>) {
        let firsts = self
            .values
            .iter()
            .filter_map(|(key, values)| Some((key.to_string(), values.first()?.clone())));
        match map {
            MapTarget::First(map) => map.extend(firsts),
            MapTarget::Value(map) => {
                map.extend(firsts.map(|(key, value)| (key, serde_json::Value::String(value))));
            }
            MapTarget::All(map) => map.extend(
                self.values
                    .iter()
                    .map(|(key, values)| (key.to_string(), values.to_vec())),
            ),
        }
    }
}

/// Assigns every value supplied for a key to a field.
///
/// Dispatch order: multi-value decoder, single-value decoder, optional
/// (unwrapped one level, then dispatched again), sequence, primitive.
///
/// # Errors
///
/// Returns the conversion error; the field keeps its previous value.
fn assign(slot: Slot<'_>, values: &[String]) -> Result<(), ConversionError> {
    let first = values.first().map(String::as_str).unwrap_or_default();
    match slot {
        Slot::DecodeAll(decoder) => {
            let target = decoder.target_name();
            decoder
                .decode_params(values)
                .map_err(|source| ConversionError::Decode { target, source })
        }
        Slot::Optional(optional) => {
            optional.replace_with(&mut |inner: Slot<'_>| assign(inner, values))
        }
        Slot::Sequence(sequence) => sequence.rebuild(
            values.len(),
            &mut |index: usize, element: Slot<'_>| coerce(element, &values[index]),
        ),
        other => coerce(other, first),
    }
}

/// Assigns a single value to a field or sequence element.
///
/// # Errors
///
/// Returns the conversion error; the target keeps its previous value.
fn coerce(slot: Slot<'_>, value: &str) -> Result<(), ConversionError> {
    match slot {
        Slot::Primitive(primitive) => primitive.assign(value),
        Slot::Decode(decoder) => {
            let target = decoder.target_name();
            decoder
                .decode_param(value)
                .map_err(|source| ConversionError::Decode { target, source })
        }
        Slot::Optional(optional) => {
            optional.replace_with(&mut |inner: Slot<'_>| coerce(inner, value))
        }
        other => Err(ConversionError::UnsupportedType {
            target: other.type_name(),
        }),
    }
}

fn assign_files(slot: Slot<'_>, uploads: &[UploadedFile]) -> Result<(), ConversionError> {
    match slot {
        Slot::Optional(optional) => {
            optional.replace_with(&mut |inner: Slot<'_>| assign_files(inner, uploads))
        }
        Slot::Sequence(sequence) => sequence.rebuild(
            uploads.len(),
            &mut |index: usize, element: Slot<'_>| put_file(element, &uploads[index]),
        ),
        other => match uploads.first() {
            Some(upload) => put_file(other, upload),
            None => Ok(()),
        },
    }
}

fn put_file(slot: Slot<'_>, upload: &UploadedFile) -> Result<(), ConversionError> {
    match slot {
        Slot::File(file) => {
            *file = upload.clone();
            Ok(())
        }
        Slot::Optional(optional) => {
            optional.replace_with(&mut |inner: Slot<'_>| put_file(inner, upload))
        }
        other => Err(ConversionError::UnsupportedType {
            target: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::field::{BindField, DecodeParam, DecodeParams};
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> FieldSource {
        pairs
            .iter()
            .map(|(key, value)| (*key, value.to_string()))
            .collect()
    }

    #[derive(Debug, Default, PartialEq)]
    struct Version(u32, u32);

    impl DecodeParam for Version {
        fn decode_param(&mut self, value: &str) -> Result<(), BoxError> {
            let (major, minor) = value.split_once('.').ok_or("expected MAJOR.MINOR")?;
            *self = Version(major.parse()?, minor.parse()?);
            Ok(())
        }
    }

    impl BindField for Version {
        fn slot(&mut self) -> Slot<'_> {
            Slot::Decode(self)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Joined(String);

    impl DecodeParams for Joined {
        fn decode_params(&mut self, values: &[String]) -> Result<(), BoxError> {
            self.0 = values.join("|");
            Ok(())
        }
    }

    impl BindField for Joined {
        fn slot(&mut self) -> Slot<'_> {
            Slot::DecodeAll(self)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Audit {
        actor: String,
        reason: Option<String>,
    }

    impl Bindable for Audit {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            const FIELDS: &[FieldDescriptor<Audit>] = &[
                FieldDescriptor::new("actor", |a: &mut Audit| &mut a.actor).query("actor"),
                FieldDescriptor::new("reason", |a: &mut Audit| &mut a.reason).query("reason"),
            ];
            FIELDS
        }
    }

    impl BindField for Audit {
        fn slot(&mut self) -> Slot<'_> {
            Slot::Record(self)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Request {
        id: i64,
        ratio: f32,
        active: bool,
        tags: Vec<String>,
        limits: Option<Vec<u16>>,
        scores: Vec<Option<i32>>,
        page: Option<u32>,
        version: Version,
        maybe_version: Option<Version>,
        joined: Joined,
        audit: Audit,
        embedded_audit: Option<Audit>,
        secret: String,
        internal: String,
    }

    impl Bindable for Request {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            const FIELDS: &[FieldDescriptor<Request>] = &[
                FieldDescriptor::new("id", |r: &mut Request| &mut r.id).query("id"),
                FieldDescriptor::new("ratio", |r: &mut Request| &mut r.ratio).query("ratio"),
                FieldDescriptor::new("active", |r: &mut Request| &mut r.active).query("active"),
                FieldDescriptor::new("tags", |r: &mut Request| &mut r.tags).query("tag"),
                FieldDescriptor::new("limits", |r: &mut Request| &mut r.limits).query("limit"),
                FieldDescriptor::new("scores", |r: &mut Request| &mut r.scores).query("score"),
                FieldDescriptor::new("page", |r: &mut Request| &mut r.page).query("page"),
                FieldDescriptor::new("version", |r: &mut Request| &mut r.version).query("v"),
                FieldDescriptor::new("maybe_version", |r: &mut Request| &mut r.maybe_version)
                    .query("mv"),
                FieldDescriptor::new("joined", |r: &mut Request| &mut r.joined).query("j"),
                FieldDescriptor::new("audit", |r: &mut Request| &mut r.audit),
                FieldDescriptor::new("embedded_audit", |r: &mut Request| &mut r.embedded_audit)
                    .embedded(),
                FieldDescriptor::new("secret", |r: &mut Request| &mut r.secret).query(""),
                FieldDescriptor::new("internal", |r: &mut Request| &mut r.internal)
                    .query("internal")
                    .read_only(),
            ];
            FIELDS
        }
    }

    #[test]
    fn binds_primitives() {
        let values = source(&[("id", "-7"), ("ratio", "0.5"), ("active", "true")]);
        let mut request = Request::default();

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.id, -7);
        assert_eq!(request.ratio, 0.5);
        assert!(request.active);
    }

    #[test]
    fn absent_keys_leave_fields_untouched() {
        let values = source(&[("other", "1")]);
        let mut request = Request {
            id: 99,
            ..Request::default()
        };

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.id, 99);
        assert_eq!(request.page, None);
    }

    #[test]
    fn present_empty_values_become_zero() {
        let values = source(&[("id", ""), ("ratio", ""), ("active", ""), ("page", "")]);
        let mut request = Request {
            id: 5,
            ratio: 2.0,
            active: true,
            ..Request::default()
        };

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.id, 0);
        assert_eq!(request.ratio, 0.0);
        assert!(!request.active);
        assert_eq!(request.page, Some(0));
    }

    #[test]
    fn repeated_keys_fill_sequences_in_order() {
        let values = source(&[("tag", "b"), ("tag", "a"), ("tag", "c")]);
        let mut request = Request {
            tags: vec!["stale".to_string(); 5],
            ..Request::default()
        };

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.tags, vec!["b", "a", "c"]);
    }

    #[test]
    fn optional_sequences_and_sequences_of_optionals() {
        let values = source(&[("limit", "1"), ("limit", "2"), ("score", "3"), ("score", "")]);
        let mut request = Request::default();

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.limits, Some(vec![1, 2]));
        assert_eq!(request.scores, vec![Some(3), Some(0)]);
    }

    #[test]
    fn sequence_error_keeps_previous_contents() {
        let values = source(&[("limit", "1"), ("limit", "x")]);
        let mut request = Request {
            limits: Some(vec![9]),
            ..Request::default()
        };

        let err = Walker::new(TagKey::Query, &values)
            .bind(&mut request)
            .unwrap_err();

        assert!(matches!(err, Failure::Conversion { ref field, .. } if field == "limit"));
        assert_eq!(request.limits, Some(vec![9]));
    }

    #[test]
    fn lookup_falls_back_to_case_insensitive() {
        let values = source(&[("ID", "3")]);
        let mut request = Request::default();

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.id, 3);
    }

    #[test]
    fn single_value_decoder_gets_first_value() {
        let values = source(&[("v", "2.1"), ("v", "9.9"), ("mv", "1.0")]);
        let mut request = Request::default();

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.version, Version(2, 1));
        assert_eq!(request.maybe_version, Some(Version(1, 0)));
    }

    #[test]
    fn multi_value_decoder_gets_all_values() {
        let values = source(&[("j", "a"), ("j", "b")]);
        let mut request = Request::default();

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.joined, Joined("a|b".to_string()));
    }

    #[test]
    fn decoder_errors_are_conversion_failures() {
        let values = source(&[("v", "two")]);
        let mut request = Request::default();

        let err = Walker::new(TagKey::Query, &values)
            .bind(&mut request)
            .unwrap_err();

        match err {
            Failure::Conversion { field, source } => {
                assert_eq!(field, "v");
                assert!(matches!(source, ConversionError::Decode { .. }));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn untagged_records_and_embedded_options_are_walked() {
        let values = source(&[("actor", "ops"), ("reason", "rotation")]);
        let mut request = Request::default();

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.audit.actor, "ops");
        assert_eq!(request.audit.reason.as_deref(), Some("rotation"));
        let embedded = request.embedded_audit.expect("embedded record allocated");
        assert_eq!(embedded.actor, "ops");
    }

    #[test]
    fn empty_tag_and_read_only_fields_are_never_bound() {
        let values = source(&[("secret", "x"), ("internal", "y"), ("", "z")]);
        let mut request = Request::default();

        Walker::new(TagKey::Query, &values).bind(&mut request).unwrap();

        assert_eq!(request.secret, "");
        assert_eq!(request.internal, "");
    }

    #[derive(Debug, Default)]
    struct TaggedEmbed {
        audit: Audit,
    }

    impl Bindable for TaggedEmbed {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            const FIELDS: &[FieldDescriptor<TaggedEmbed>] =
                &[FieldDescriptor::new("audit", |t: &mut TaggedEmbed| &mut t.audit)
                    .embedded()
                    .query("audit")];
            FIELDS
        }
    }

    #[test]
    fn embedded_record_with_tag_is_ambiguous_even_without_data() {
        let values = FieldSource::new();
        let mut destination = TaggedEmbed::default();

        let err = Walker::new(TagKey::Query, &values)
            .bind(&mut destination)
            .unwrap_err();

        assert!(matches!(
            err,
            Failure::AmbiguousMapping { field: "audit", .. }
        ));
    }

    #[test]
    fn embedded_tag_only_matters_for_its_own_source() {
        let values = source(&[("actor", "me")]);
        let mut destination = TaggedEmbed::default();

        Walker::new(TagKey::Form, &values)
            .bind(&mut destination)
            .unwrap();

        assert_eq!(destination.audit.actor, "");
    }

    #[derive(Debug, Default)]
    struct FrozenEmbed {
        audit: Audit,
        backup: Option<Audit>,
    }

    impl Bindable for FrozenEmbed {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            const FIELDS: &[FieldDescriptor<FrozenEmbed>] = &[
                FieldDescriptor::new("audit", |f: &mut FrozenEmbed| &mut f.audit)
                    .embedded()
                    .read_only(),
                FieldDescriptor::new("backup", |f: &mut FrozenEmbed| &mut f.backup)
                    .embedded()
                    .read_only(),
            ];
            FIELDS
        }
    }

    #[test]
    fn read_only_embedded_records_are_not_walked() {
        let values = source(&[("actor", "me"), ("reason", "why")]);
        let mut destination = FrozenEmbed::default();

        Walker::new(TagKey::Query, &values)
            .bind(&mut destination)
            .unwrap();

        assert_eq!(destination.audit, Audit::default());
        assert_eq!(destination.backup, None);
    }

    #[derive(Debug, Default)]
    struct Upload {
        avatar: Option<UploadedFile>,
        docs: Vec<UploadedFile>,
        extras: Vec<Option<UploadedFile>>,
        title: String,
    }

    impl Bindable for Upload {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            const FIELDS: &[FieldDescriptor<Upload>] = &[
                FieldDescriptor::new("avatar", |u: &mut Upload| &mut u.avatar).form("avatar"),
                FieldDescriptor::new("docs", |u: &mut Upload| &mut u.docs).form("docs"),
                FieldDescriptor::new("extras", |u: &mut Upload| &mut u.extras).form("extras"),
                FieldDescriptor::new("title", |u: &mut Upload| &mut u.title).form("title"),
            ];
            FIELDS
        }
    }

    #[test]
    fn file_shapes_bind_from_uploads() {
        let values = source(&[("title", "holiday")]);
        let mut files = FileSource::new();
        files.append("avatar", UploadedFile::new("me.png", None, vec![1]));
        files.append("docs", UploadedFile::new("a.pdf", None, vec![2]));
        files.append("docs", UploadedFile::new("b.pdf", None, vec![3]));

        let mut upload = Upload::default();
        Walker::new(TagKey::Form, &values)
            .with_files(&files)
            .bind(&mut upload)
            .unwrap();

        assert_eq!(upload.avatar.as_ref().map(UploadedFile::filename), Some("me.png"));
        let names: Vec<&str> = upload.docs.iter().map(UploadedFile::filename).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert!(upload.extras.is_empty());
        assert_eq!(upload.title, "holiday");
    }

    #[derive(Debug, Default)]
    struct BareUpload {
        file: UploadedFile,
    }

    impl Bindable for BareUpload {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            const FIELDS: &[FieldDescriptor<BareUpload>] =
                &[FieldDescriptor::new("file", |b: &mut BareUpload| &mut b.file).form("file")];
            FIELDS
        }
    }

    #[test]
    fn bare_file_field_is_ambiguous() {
        let values = FieldSource::new();
        let mut files = FileSource::new();
        files.append("file", UploadedFile::new("x.bin", None, vec![0]));

        let err = Walker::new(TagKey::Form, &values)
            .with_files(&files)
            .bind(&mut BareUpload::default())
            .unwrap_err();

        assert!(matches!(err, Failure::AmbiguousMapping { field: "file", .. }));
    }

    #[test]
    fn maps_receive_first_or_all_values() {
        let values = source(&[("a", "1"), ("a", "2"), ("b", "3")]);

        let mut firsts: HashMap<String, String> = HashMap::new();
        Walker::new(TagKey::Param, &values).bind(&mut firsts).unwrap();
        assert_eq!(firsts["a"], "1");
        assert_eq!(firsts["b"], "3");

        let mut all: HashMap<String, Vec<String>> = HashMap::new();
        Walker::new(TagKey::Param, &values).bind(&mut all).unwrap();
        assert_eq!(all["a"], vec!["1", "2"]);

        let mut json: HashMap<String, serde_json::Value> = HashMap::new();
        Walker::new(TagKey::Param, &values).bind(&mut json).unwrap();
        assert_eq!(json["a"], serde_json::Value::String("1".to_string()));
    }

    #[test]
    fn unsupported_roots_only_fail_for_forms() {
        let values = source(&[("a", "1")]);
        let mut raw = String::new();

        assert!(Walker::new(TagKey::Query, &values).bind(&mut raw).is_ok());
        assert!(matches!(
            Walker::new(TagKey::Form, &values).bind(&mut raw),
            Err(Failure::InvalidDestination { .. })
        ));
    }

    #[test]
    fn records_cannot_be_coerced_from_strings() {
        let mut audit = Audit::default();
        let err = coerce(audit.slot(), "x").unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedType { target: "record" }));
    }
}
