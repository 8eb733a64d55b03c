use std::collections::BTreeMap;

use common::{parse, ready_envelope, text};
use govtalk_core::{
    ENVELOPE_NAMESPACE, XSI_NAMESPACE,
    canon::CanonicalizationMode,
    digest::{DigestError, DigestMarker, extract_body, root_namespaces},
    envelope::EnvelopeError,
    message::ChannelRoute,
    writer::XmlWriter,
};

mod common;

const VAT_NAMESPACE: &str = "http://www.govtalk.gov.uk/taxation/vat/vatdeclaration/2";

fn marked_body(marker: &DigestMarker, value: &str) -> XmlWriter {
    let mut writer = XmlWriter::new();
    writer.start_element("IRenvelope");
    writer.attribute("xmlns", VAT_NAMESPACE);
    writer.start_element("IRheader");
    marker.write_placeholder(&mut writer);
    writer.end_element();
    writer.write_element("Value", value);
    writer.end_element();
    writer
}

fn package_with_mark(marker: DigestMarker, value: &str) -> String {
    let mut envelope = ready_envelope("");
    envelope.set_body(marked_body(&marker, value).finish().unwrap());
    envelope.set_digest(Some(marker));
    envelope.package().unwrap().xml
}

fn mark_of(xml: &str) -> String {
    text(&parse(xml), &["Body", "IRenvelope", "IRheader", "IRmark"])
}

fn envelope_namespaces() -> BTreeMap<String, String> {
    BTreeMap::from([
        (String::new(), ENVELOPE_NAMESPACE.to_owned()),
        ("xsi".to_owned(), XSI_NAMESPACE.to_owned()),
    ])
}

#[test]
fn digest_of_known_body() {
    let body = "\n<Test><Value>1</Value></Test>\n";

    assert_eq!(
        DigestMarker::new()
            .digest(body, &envelope_namespaces())
            .unwrap(),
        "MJDBAPlSYgRuflC+jmUE7LJuQZo="
    );
    assert_eq!(
        DigestMarker::new()
            .with_mode(CanonicalizationMode::Inclusive)
            .digest(body, &envelope_namespaces())
            .unwrap(),
        "t92aJ4ckSfxIe9lDLK24MbTOjRY="
    );
}

// Expected digests from `xmllint --exc-c14n` and `--c14n` over the standalone Body.
#[test]
fn line_ends_do_not_change_digest() {
    let unix = "\n<A>\n<B>1</B>\n</A>\n";
    let windows = "\r\n<A>\r\n<B>1</B>\r\n</A>\r\n";
    let marker = DigestMarker::new();

    assert_eq!(
        marker.digest(unix, &envelope_namespaces()).unwrap(),
        "Qjn76iiITwK13HoImOiwsoikgZg="
    );
    assert_eq!(
        marker.digest(windows, &envelope_namespaces()).unwrap(),
        "Qjn76iiITwK13HoImOiwsoikgZg="
    );

    let inclusive = DigestMarker::new().with_mode(CanonicalizationMode::Inclusive);
    assert_eq!(
        inclusive.digest(windows, &envelope_namespaces()).unwrap(),
        "QGCsW0mXzK2ep8Qbs/3cz5ziOfM="
    );
}

#[test]
fn placeholder_is_replaced_by_body_digest() {
    let xml = package_with_mark(DigestMarker::new(), "100.00");
    let mark = mark_of(&xml);

    assert!(!xml.contains("IRmark+Token"));
    assert_eq!(mark.len(), 28);

    let unmarked = extract_body(&xml)
        .unwrap()
        .replace(&format!("<IRmark Type=\"generic\">{mark}</IRmark>"), "");
    let namespaces = root_namespaces(&xml).unwrap();

    assert_eq!(namespaces, envelope_namespaces());
    assert_eq!(DigestMarker::new().digest(&unmarked, &namespaces).unwrap(), mark);
}

#[test]
fn digest_is_deterministic() {
    let first = package_with_mark(DigestMarker::new(), "100.00");
    let second = package_with_mark(DigestMarker::new(), "100.00");

    assert_ne!(first, second);
    assert_eq!(mark_of(&first), mark_of(&second));
}

#[test]
fn digest_changes_with_one_character() {
    let first = package_with_mark(DigestMarker::new(), "100.00");
    let second = package_with_mark(DigestMarker::new(), "100.01");

    assert_ne!(mark_of(&first), mark_of(&second));
}

#[test]
fn modes_give_different_marks() {
    let exclusive = package_with_mark(DigestMarker::new(), "100.00");
    let inclusive = package_with_mark(
        DigestMarker::new().with_mode(CanonicalizationMode::Inclusive),
        "100.00",
    );

    assert_ne!(mark_of(&exclusive), mark_of(&inclusive));
}

#[test]
fn missing_placeholder_fails() {
    let mut envelope = ready_envelope("<IRenvelope><Value>1</Value></IRenvelope>");
    envelope.set_digest(Some(DigestMarker::new()));

    assert!(matches!(
        envelope.package(),
        Err(EnvelopeError::Digest(DigestError::PlaceholderCount(0)))
    ));
}

#[test]
fn duplicated_placeholder_fails() {
    let marker = DigestMarker::new();
    let mut writer = XmlWriter::new();
    writer.start_element("IRenvelope");
    marker.write_placeholder(&mut writer);
    marker.write_placeholder(&mut writer);
    writer.end_element();

    let mut envelope = ready_envelope("");
    envelope.set_body(writer.finish().unwrap());
    envelope.set_digest(Some(marker));

    assert!(matches!(
        envelope.package(),
        Err(EnvelopeError::Digest(DigestError::PlaceholderCount(2)))
    ));
}

#[test]
fn placeholder_outside_mark_element_fails() {
    let mut envelope = ready_envelope("<IRenvelope><Other>IRmark+Token</Other></IRenvelope>");
    envelope.set_digest(Some(DigestMarker::new()));

    assert!(matches!(
        envelope.package(),
        Err(EnvelopeError::Digest(DigestError::MarkElementNotFound(_)))
    ));
}

#[test]
fn body_must_appear_once() {
    let package = "<GovTalkMessage><Body>a</Body><Body>b</Body></GovTalkMessage>";

    assert!(matches!(
        DigestMarker::new().mark(package),
        Err(DigestError::BodyBoundary(2))
    ));
    assert!(matches!(
        extract_body("<GovTalkMessage/>"),
        Err(DigestError::BodyBoundary(0))
    ));
}

#[test]
fn custom_mark_element() {
    let marker = DigestMarker::new().with_element("Mark", "Mark+Token");
    let mut envelope = ready_envelope("");
    envelope.set_body(marked_body(&marker, "1").finish().unwrap());
    envelope.set_digest(Some(marker));

    let xml = envelope.package().unwrap().xml;

    assert!(!xml.contains("Mark+Token"));
    assert_eq!(text(&parse(&xml), &["Body", "IRenvelope", "IRheader", "Mark"]).len(), 28);
}

#[test]
fn placeholder_outside_body_is_left_alone() {
    let marker = DigestMarker::new();
    let mut envelope = ready_envelope("");
    envelope.set_body(marked_body(&marker, "1").finish().unwrap());
    envelope
        .add_channel_route(ChannelRoute::new("http://www.example.com/filing").product("IRmark+Token"))
        .unwrap();
    envelope.set_digest(Some(marker));

    let xml = envelope.package().unwrap().xml;

    assert_eq!(
        text(&parse(&xml), &["GovTalkDetails", "ChannelRouting", "Channel", "Product"]),
        "IRmark+Token"
    );
    assert_eq!(mark_of(&xml).len(), 28);
}
