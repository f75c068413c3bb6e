/// Trim the ends and collapse every whitespace run to one space.
pub fn normalize(text: Option<&str>) -> String {
    match text {
        Some(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
        None => String::new(),
    }
}
