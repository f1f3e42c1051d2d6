use std::process::Command;

fn main() {
    // Get git commit hash
    if let Ok(output) = Command::new("git").args(["rev-parse", "HEAD"]).output() {
        let git_hash = String::from_utf8_lossy(&output.stdout);
        println!("cargo:rustc-env=GIT_HASH={}", git_hash.trim());
    }

    // Get git branch
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
    {
        let git_branch = String::from_utf8_lossy(&output.stdout);
        println!("cargo:rustc-env=GIT_BRANCH={}", git_branch.trim());
    }

    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    // Tool names come from the dispatch_tool match in server.rs
    println!("cargo:rerun-if-changed=src/server.rs");
    println!("cargo:rustc-env=MCP_TOOLS={}", extract_mcp_tools());
}

fn extract_mcp_tools() -> String {
    let server_rs = match std::fs::read_to_string("src/server.rs") {
        Ok(content) => content,
        Err(_) => return String::new(),
    };

    let mut tools: Vec<String> = Vec::new();
    let mut in_dispatch = false;

    for line in server_rs.lines() {
        if line.contains("let result = match tool_name") {
            in_dispatch = true;
            continue;
        }
        if !in_dispatch {
            continue;
        }

        let trimmed = line.trim();
        // Match arm pattern: `"tool_name" =>`
        if trimmed.starts_with('"') && trimmed.contains("\" =>") {
            if let Some(end) = trimmed[1..].find('"') {
                let name = &trimmed[1..1 + end];
                if name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
                    && !tools.iter().any(|t| t == name)
                {
                    tools.push(name.to_string());
                }
            }
        }

        if trimmed.starts_with("unknown =>") || trimmed.starts_with("_ =>") {
            break;
        }
    }

    tools.join(",")
}
