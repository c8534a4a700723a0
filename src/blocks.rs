//! Block parser for `[Section]`-delimited settings files
//!
//! Splits a tool's plain-text output into named blocks:
//! - a line of the form `[Name]` starts block `Name`
//! - lines before the first boundary belong to the implicit `header` block
//! - blank lines are skipped and never separate content

use std::collections::HashMap;
use std::io::BufRead;

/// Named blocks of a settings file, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct Blocks {
    order: Vec<String>,
    lines: HashMap<String, Vec<String>>,
}

impl Blocks {
    /// Partition the input into named blocks.
    pub fn parse<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut blocks = Blocks::default();
        blocks.start_block("header");

        let mut current = String::from("header");
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with('[') {
                current = line.trim_matches(|c| c == '[' || c == ']').to_string();
                blocks.start_block(&current);
                continue;
            }

            if let Some(content) = blocks.lines.get_mut(&current) {
                content.push(line);
            }
        }

        Ok(blocks)
    }

    fn start_block(&mut self, name: &str) {
        if !self.lines.contains_key(name) {
            self.order.push(name.to_string());
            self.lines.insert(name.to_string(), Vec::new());
        }
    }

    /// Content lines of a block, if the block exists.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.lines.get(name).map(Vec::as_slice)
    }

    /// Block names in order of first appearance.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Blocks {
        Blocks::parse(Cursor::new(text)).unwrap()
    }

    #[test]
    fn test_header_collects_preamble() {
        let blocks = parse("AdapterRemoval ver. 2.1.7\n[Adapter sequences]\nAdapter1: ACGT\n");
        assert_eq!(
            blocks.get("header").unwrap(),
            &["AdapterRemoval ver. 2.1.7".to_string()]
        );
        assert_eq!(
            blocks.get("Adapter sequences").unwrap(),
            &["Adapter1: ACGT".to_string()]
        );
    }

    #[test]
    fn test_blank_lines_do_not_split_blocks() {
        let dense = parse("[Stats]\na: 1\nb: 2\n");
        let sparse = parse("\n[Stats]\n\na: 1\n\n\nb: 2\n\n");
        assert_eq!(dense.get("Stats"), sparse.get("Stats"));
        assert_eq!(dense.get("header"), sparse.get("header"));
    }

    #[test]
    fn test_order_of_first_appearance() {
        let blocks = parse("[B]\nx\n[A]\ny\n[C]\nz\n");
        let names: Vec<&str> = blocks.names().collect();
        assert_eq!(names, vec!["header", "B", "A", "C"]);
    }

    #[test]
    fn test_missing_block_is_none() {
        let blocks = parse("[Stats]\na: 1\n");
        assert!(blocks.get("Length distribution").is_none());
    }

    #[test]
    fn test_leading_boundary_leaves_header_empty() {
        let blocks = parse("[Stats]\na: 1\n");
        assert!(blocks.get("header").unwrap().is_empty());
    }
}
