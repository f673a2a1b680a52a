use crate::data_models::DataType;

/// Inline flag spellings and the data type each one selects.
/// Matched case-insensitively against whole whitespace-separated tokens.
pub const FLAGS: &[(&str, DataType)] = &[
    ("-u", DataType::Username),
    ("--username", DataType::Username),
    ("-e", DataType::Email),
    ("--email", DataType::Email),
    ("-p", DataType::Phone),
    ("--phone", DataType::Phone),
    ("-a", DataType::Address),
    ("--address", DataType::Address),
    ("-s", DataType::Social),
    ("--social", DataType::Social),
    ("-t", DataType::Text),
    ("--text", DataType::Text),
    ("--title", DataType::Text),
    ("--content", DataType::Text),
    ("-l", DataType::Url),
    ("--link", DataType::Url),
    ("--url", DataType::Url),
    ("-all", DataType::All),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub clean_query: String,
    /// `None` when no flag token was present; callers keep their current type.
    pub detected_type: Option<DataType>,
}

pub fn flag_type(token: &str) -> Option<DataType> {
    let token = token.to_lowercase();
    FLAGS
        .iter()
        .find(|(flag, _)| *flag == token)
        .map(|(_, data_type)| *data_type)
}

/// Strips flag tokens out of `input`. When several flags are present the last
/// one wins. A query made only of flags comes back empty.
pub fn parse(input: &str) -> ParsedQuery {
    let mut kept: Vec<&str> = Vec::new();
    let mut detected_type = None;

    for token in input.split_whitespace() {
        match flag_type(token) {
            Some(data_type) => detected_type = Some(data_type),
            None => kept.push(token),
        }
    }

    ParsedQuery {
        clean_query: kept.join(" "),
        detected_type,
    }
}

/// Help lines for the flag syntax, grouped by data type in table order.
pub fn flag_help() -> Vec<(DataType, Vec<&'static str>)> {
    let mut groups: Vec<(DataType, Vec<&'static str>)> = Vec::new();
    for &(flag, data_type) in FLAGS {
        match groups.iter_mut().find(|(t, _)| *t == data_type) {
            Some((_, spellings)) => spellings.push(flag),
            None => groups.push((data_type, vec![flag])),
        }
    }
    groups
}

#[test]
fn test_flag_help_groups_spellings() {
    let help = flag_help();
    assert_eq!(help.len(), 8);
    assert_eq!(help[0], (DataType::Username, vec!["-u", "--username"]));

    let text = help
        .iter()
        .find(|(t, _)| *t == DataType::Text)
        .map(|(_, s)| s.clone())
        .unwrap();
    assert_eq!(text, vec!["-t", "--text", "--title", "--content"]);

    assert_eq!(help.last().unwrap(), &(DataType::All, vec!["-all"]));
}

#[test]
fn test_flag_type_lookup() {
    assert_eq!(flag_type("-E"), Some(DataType::Email));
    assert_eq!(flag_type("--URL"), Some(DataType::Url));
    assert_eq!(flag_type("--all"), None);
    assert_eq!(flag_type("-x"), None);
    assert_eq!(flag_type(""), None);
}
