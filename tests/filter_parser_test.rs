use scim_filter::error::AppError;
use scim_filter::filter::{Filter, FilterType};
use scim_filter::parser::parse_filter;

// Filter examples from RFC 7644 section 3.4.2.2
const RFC7644_FILTERS: &[&str] = &[
    "userName eq \"bjensen\"",
    "name.familyName co \"O'Malley\"",
    "userName sw \"J\"",
    "urn:ietf:params:scim:schemas:core:2.0:User:userName sw \"J\"",
    "title pr",
    "meta.lastModified gt \"2011-05-13T04:42:34Z\"",
    "meta.lastModified ge \"2011-05-13T04:42:34Z\"",
    "meta.lastModified lt \"2011-05-13T04:42:34Z\"",
    "meta.lastModified le \"2011-05-13T04:42:34Z\"",
    "title pr and userType eq \"Employee\"",
    "title pr or userType eq \"Intern\"",
    "schemas eq \"urn:ietf:params:scim:schemas:extension:enterprise:2.0:User\"",
    "userType eq \"Employee\" and (emails co \"example.com\" or emails.value co \"example.org\")",
    "userType ne \"Employee\" and not (emails co \"example.com\" or emails.value co \"example.org\")",
    "userType eq \"Employee\" and (emails.type eq \"work\")",
    "userType eq \"Employee\" and emails[type eq \"work\" and value co \"@example.com\"]",
    "emails[type eq \"work\" and value co \"@example.com\"] or ims[type eq \"xmpp\" and value co \"@foo.com\"]",
];

#[test]
fn test_rfc7644_filters_parse() {
    for text in RFC7644_FILTERS {
        let filter = Filter::from(text).unwrap_or_else(|e| panic!("{}: {}", text, e));
        assert_eq!(filter, parse_filter(text).unwrap());
    }
}

#[test]
fn test_display_round_trips() {
    for text in RFC7644_FILTERS {
        let filter = Filter::from(text).unwrap();
        let rendered = filter.to_string();
        let reparsed = Filter::from(&rendered)
            .unwrap_or_else(|e| panic!("{} rendered as {}: {}", text, rendered, e));
        assert_eq!(reparsed, filter, "rendered: {}", rendered);
    }
}

#[test]
fn test_top_level_structure() {
    let filter = Filter::from(RFC7644_FILTERS[13]).unwrap();
    assert_eq!(filter.filter_type(), FilterType::And);
    match &filter {
        Filter::And(children) => {
            assert_eq!(children.len(), 2);
            assert_eq!(children[0].filter_type(), FilterType::Not);
            assert_eq!(children[1].filter_type(), FilterType::Not);
        }
        other => panic!("unexpected filter: {:?}", other),
    }

    let filter = Filter::from(RFC7644_FILTERS[16]).unwrap();
    match &filter {
        Filter::Or(children) => assert!(children.iter().all(Filter::is_complex)),
        other => panic!("unexpected filter: {:?}", other),
    }
}

#[test]
fn test_namespaced_path() {
    let filter = Filter::from(RFC7644_FILTERS[3]).unwrap();
    let path = filter.path().unwrap();
    assert_eq!(
        path.namespace(),
        Some("urn:ietf:params:scim:schemas:core:2.0:User")
    );
    assert_eq!(path.attribute_names(), "userName");
}

#[test]
fn test_parse_errors_are_invalid_filter() {
    for text in [
        "",
        "userName",
        "userName eq",
        "userName xx \"a\"",
        "userName eq \"unterminated",
        "(userName eq \"a\"",
        "userName eq \"a\")",
        "emails[type eq \"work\"",
        "userName eq \"a\" and",
        "or userName eq \"a\"",
    ] {
        match Filter::from(text) {
            Err(err @ AppError::FilterParse(_)) => {
                assert_eq!(err.scim_type(), "invalidFilter", "filter: {:?}", text)
            }
            other => panic!("expected parse error for {:?}, got {:?}", text, other),
        }
    }
}
