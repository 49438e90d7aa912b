//! Parsing of engine XML responses.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::TallyError;

/// A company (ledger book) known to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub name: String,
    pub guid: String,
}

/// Which direct child of a `<COMPANY>` element is being read.
enum CompanyField {
    Name,
    Guid,
}

/// Extracts companies from a `ListOfCompanies` export.
///
/// Document order is preserved. Entries without a `<NAME>` are skipped and
/// a missing `<GUID>` becomes the empty string. Only direct children of
/// each `<COMPANY>` element are consulted.
pub fn parse_companies(xml: &str) -> Result<Vec<Company>, TallyError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut companies = Vec::new();
    let mut in_company = false;
    // Depth below the COMPANY element; 0 means at the element itself.
    let mut depth = 0usize;
    let mut field: Option<CompanyField> = None;
    let mut name: Option<String> = None;
    let mut guid: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if !in_company {
                    if e.name().as_ref() == b"COMPANY" {
                        in_company = true;
                        depth = 0;
                        field = None;
                        name = None;
                        guid = None;
                    }
                } else {
                    depth += 1;
                    if depth == 1 {
                        field = match e.name().as_ref() {
                            b"NAME" => Some(CompanyField::Name),
                            b"GUID" => Some(CompanyField::Guid),
                            _ => None,
                        };
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if in_company && depth == 1 {
                    let text = t
                        .unescape()
                        .map_err(|e| TallyError::Protocol(e.to_string()))?;
                    match field {
                        Some(CompanyField::Name) => name = Some(text.into_owned()),
                        Some(CompanyField::Guid) => guid = Some(text.into_owned()),
                        None => {}
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if in_company && depth == 1 {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    match field {
                        Some(CompanyField::Name) => name = Some(text),
                        Some(CompanyField::Guid) => guid = Some(text),
                        None => {}
                    }
                }
            }
            Ok(Event::End(_)) => {
                if in_company {
                    if depth == 0 {
                        in_company = false;
                        if let Some(company_name) = name.take() {
                            if !company_name.is_empty() {
                                companies.push(Company {
                                    name: company_name,
                                    guid: guid.take().unwrap_or_default(),
                                });
                            }
                        }
                        guid = None;
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            field = None;
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(TallyError::Protocol(e.to_string())),
        }
    }

    Ok(companies)
}

/// Counts result records of the given collection type in an export.
///
/// The engine upcases element names in responses while the catalog stores
/// mixed-case types, so tags are matched ASCII-case-insensitively. This is
/// a diagnostic; malformed XML counts as zero rather than failing.
pub fn count_records(xml: &str, collection_type: &str) -> usize {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut count = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name()
                    .as_ref()
                    .eq_ignore_ascii_case(collection_type.as_bytes())
                {
                    count += 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return 0,
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_companies_preserves_order_and_defaults_guid() {
        let xml = "<ENVELOPE><BODY>\
                   <COMPANY><NAME>Acme</NAME><GUID>g1</GUID></COMPANY>\
                   <COMPANY><NAME>Beta</NAME></COMPANY>\
                   </BODY></ENVELOPE>";

        let companies = parse_companies(xml).unwrap();
        assert_eq!(
            companies,
            vec![
                Company {
                    name: "Acme".to_string(),
                    guid: "g1".to_string()
                },
                Company {
                    name: "Beta".to_string(),
                    guid: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_parse_companies_skips_nameless_entries() {
        let xml = "<ENVELOPE>\
                   <COMPANY><GUID>orphan</GUID></COMPANY>\
                   <COMPANY><NAME>Real</NAME><GUID>g2</GUID></COMPANY>\
                   </ENVELOPE>";

        let companies = parse_companies(xml).unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "Real");
    }

    #[test]
    fn test_parse_companies_ignores_nested_name_elements() {
        let xml = "<ENVELOPE>\
                   <COMPANY><REMOTEDETAILS><NAME>nested</NAME></REMOTEDETAILS></COMPANY>\
                   </ENVELOPE>";

        let companies = parse_companies(xml).unwrap();
        assert!(companies.is_empty());
    }

    #[test]
    fn test_parse_companies_unescapes_entities() {
        let xml = "<ENVELOPE><COMPANY><NAME>Smith &amp; Sons</NAME></COMPANY></ENVELOPE>";

        let companies = parse_companies(xml).unwrap();
        assert_eq!(companies[0].name, "Smith & Sons");
    }

    #[test]
    fn test_parse_companies_empty_response() {
        let companies = parse_companies("<ENVELOPE><BODY></BODY></ENVELOPE>").unwrap();
        assert!(companies.is_empty());
    }

    #[test]
    fn test_parse_companies_malformed_xml_is_protocol_error() {
        let err = parse_companies("<COMPANY><NAME>Acme</GUID></COMPANY>").unwrap_err();
        assert!(matches!(err, TallyError::Protocol(_)));
    }

    #[test]
    fn test_count_records_is_case_insensitive() {
        let xml = "<ENVELOPE><BODY>\
                   <LEDGER><NAME>Cash</NAME></LEDGER>\
                   <LEDGER><NAME>Bank</NAME></LEDGER>\
                   <LEDGER/>\
                   </BODY></ENVELOPE>";

        assert_eq!(count_records(xml, "Ledger"), 3);
        assert_eq!(count_records(xml, "Voucher"), 0);
    }

    #[test]
    fn test_count_records_malformed_xml_is_zero() {
        assert_eq!(count_records("<LEDGER><NAME>x</WRONG>", "Ledger"), 0);
    }
}
