/// Paths kept out of the build context, grouped by reason
const EXCLUSIONS: &[(&str, &[&str])] = &[
    ("Build output", &["target/"]),
    ("Version control", &[".git/", ".gitignore"]),
    (
        "Secrets and local configuration",
        &[".env", ".env.*", "config/local.*", "*.pem", "*.key"],
    ),
    ("Editors", &[".idea/", ".vscode/"]),
];

/// Render the `.dockerignore` file
pub fn render_dockerignore() -> String {
    EXCLUSIONS
        .iter()
        .map(|(section, patterns)| {
            let mut block = format!("# {}\n", section);
            for pattern in *patterns {
                block.push_str(pattern);
                block.push('\n');
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excludes_artifacts_vcs_and_secrets() {
        let rendered = render_dockerignore();
        let lines: Vec<&str> = rendered.lines().collect();

        for pattern in ["target/", ".git/", ".env", "config/local.*", "*.key"] {
            assert!(lines.contains(&pattern), "missing {}", pattern);
        }
    }

    #[test]
    fn test_matches_committed_file() {
        assert_eq!(render_dockerignore(), include_str!("../../.dockerignore"));
    }
}
