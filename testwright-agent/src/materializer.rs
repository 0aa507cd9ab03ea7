use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::identity::Identity;
use crate::types::{TestCase, TestStep};

/// Fixed success token a generated script prints after completing all steps.
pub const PASS_SENTINEL: &str = "TESTWRIGHT: PASS";

static QUOTED_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());
static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

/// Field-value heuristics for fill steps that name a well-known field.
const FIELD_MAP: &[(&str, &str, &str)] = &[
    ("first name", "Test", "#first-name, input[name='firstName']"),
    ("last name", "User", "#last-name, input[name='lastName']"),
    ("zip", "12345", "#postal-code, input[name='postalCode']"),
    ("postal", "12345", "#postal-code, input[name='postalCode']"),
];

/// Click-target heuristics for steps that carry no explicit selector.
const CLICK_MAP: &[(&str, &str)] = &[
    ("add to cart", "button:has-text(\"Add to cart\")"),
    ("cart", ".shopping_cart_link, #shopping_cart_container a"),
    ("checkout", "#checkout, button:has-text(\"Checkout\")"),
    ("continue", "#continue, input[type='submit']"),
    ("finish", "#finish, button[name='finish']"),
];

/// A generated, stand-alone executable test script.
///
/// Immutable and 1:1 bound to (suite, case id, generation timestamp); the
/// "current" artifact for a case is the one with the latest timestamp.
#[derive(Debug, Clone)]
pub struct ScriptArtifact {
    pub suite: String,
    pub case_id: String,
    pub generated_at: String,
    pub path: PathBuf,
}

/// Emits one stand-alone Playwright (Node.js) script per test case.
///
/// The script performs its own independent login with the secret embedded
/// directly, acceptable because its only audience is the operator's machine;
/// it runs entirely outside the secrecy boundary that keeps credentials away
/// from the AI capability.
pub struct ScriptMaterializer {
    artifacts_dir: PathBuf,
}

impl ScriptMaterializer {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self { artifacts_dir: artifacts_dir.into() }
    }

    /// Write the script for one test case and return its artifact record.
    pub fn materialize(
        &self,
        suite: &str,
        case: &TestCase,
        identity: &Identity,
    ) -> std::io::Result<ScriptArtifact> {
        let generated_at = Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
        let filename =
            format!("{}_{}_{}.js", sanitize(suite), sanitize(&case.id), generated_at);
        let path = self.artifacts_dir.join(filename);

        fs::create_dir_all(&self.artifacts_dir)?;
        fs::write(&path, script_source(suite, case, identity, &generated_at))?;
        info!(path = %path.display(), case = %case.id, "materialized script");

        Ok(ScriptArtifact {
            suite: suite.to_string(),
            case_id: case.id.clone(),
            generated_at,
            path,
        })
    }

    /// The latest-generation artifact for a case, if any exists.
    pub fn current_artifact(&self, suite: &str, case_id: &str) -> Option<PathBuf> {
        let prefix = format!("{}_{}_", sanitize(suite), sanitize(case_id));
        let entries = fs::read_dir(&self.artifacts_dir).ok()?;

        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().is_some_and(|ext| ext == "js")
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&prefix))
            })
            // Timestamps are fixed-width, so lexicographic max is newest.
            .max()
    }

    /// Suite metadata written next to the scripts: identifiers only, never
    /// the password.
    pub fn write_suite_metadata(
        &self,
        suite: &str,
        cases: &[TestCase],
        scripts: &[ScriptArtifact],
        identity: &Identity,
    ) -> std::io::Result<PathBuf> {
        let metadata = json!({
            "suite_name": suite,
            "generated_at": Utc::now().to_rfc3339(),
            "test_count": cases.len(),
            "scripts": scripts.iter().map(|s| s.path.display().to_string()).collect::<Vec<_>>(),
            "url": identity.login_url,
            "username": identity.username(),
        });

        let path = self.artifacts_dir.join(format!("{}_metadata.json", sanitize(suite)));
        fs::create_dir_all(&self.artifacts_dir)?;
        match serde_json::to_string_pretty(&metadata) {
            Ok(body) => fs::write(&path, body)?,
            Err(e) => warn!(error = %e, "could not serialize suite metadata"),
        }
        Ok(path)
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect::<String>()
        .chars()
        .take(50)
        .collect()
}

/// Single-quoted JavaScript string literal.
fn js_str(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "");
    format!("'{escaped}'")
}

fn script_source(suite: &str, case: &TestCase, identity: &Identity, generated_at: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "// Test Case : {}\n// Title     : {}\n// Suite     : {}\n// Generated : {}\n",
        case.id, case.title, suite, generated_at
    ));
    out.push_str("const { chromium } = require('playwright');\n\n");
    out.push_str(&format!("const SENTINEL = {};\n", js_str(PASS_SENTINEL)));
    out.push_str(&format!("const LOGIN_URL = {};\n", js_str(&identity.login_url)));
    out.push_str(&format!("const USERNAME = {};\n", js_str(identity.username())));
    // Embedded deliberately: this artifact stays on the operator's machine.
    out.push_str(&format!("const PASSWORD = {};\n\n", js_str(identity.password().expose())));

    out.push_str("(async () => {\n");
    out.push_str("  const browser = await chromium.launch({ headless: true });\n");
    out.push_str("  const page = await browser.newPage();\n");
    out.push_str("  try {\n");

    // Independent login; skipped when no login form is on the page.
    out.push_str("    await page.goto(LOGIN_URL, { waitUntil: 'networkidle' });\n");
    out.push_str(&format!(
        "    const loginForm = page.locator({});\n",
        js_str("input[name='user-name'], #user-name, input[type='email']")
    ));
    out.push_str("    if (await loginForm.count() > 0) {\n");
    out.push_str("      await loginForm.first().fill(USERNAME);\n");
    out.push_str(&format!(
        "      await page.locator({}).first().fill(PASSWORD);\n",
        js_str("input[name='password'], #password, input[type='password']")
    ));
    out.push_str(&format!(
        "      await page.locator({}).first().click();\n",
        js_str("#login-button, input[type='submit'], button[type='submit']")
    ));
    out.push_str("      await page.waitForLoadState('networkidle');\n");
    out.push_str("    }\n\n");

    for (i, step) in case.steps.iter().enumerate() {
        emit_step(&mut out, i + 1, step);
    }

    out.push_str("\n    console.log(SENTINEL);\n");
    out.push_str("    await browser.close();\n");
    out.push_str("    process.exit(0);\n");
    out.push_str("  } catch (err) {\n");
    out.push_str("    console.error('step failed:', err);\n");
    out.push_str("    await browser.close();\n");
    out.push_str("    process.exit(1);\n");
    out.push_str("  }\n");
    out.push_str("})();\n");
    out
}

/// Map one step onto a concrete action inferred from its action text.
fn emit_step(out: &mut String, number: usize, step: &TestStep) {
    let action = step.action_text.to_lowercase();
    out.push_str(&format!(
        "    console.log({});\n",
        js_str(&format!("Step {number}: {}", step.action_text))
    ));

    let is_fill = ["fill", "enter", "input", "type"].iter().any(|kw| action.contains(kw));
    let is_click = ["click", "add", "navigate"].iter().any(|kw| action.contains(kw));
    let is_verify = ["verify", "assert"].iter().any(|kw| action.contains(kw));

    if action.starts_with("navigate") {
        if let Some(url) = HTTP_URL.find(&step.action_text) {
            out.push_str(&format!(
                "    await page.goto({}, {{ waitUntil: 'networkidle' }});\n",
                js_str(url.as_str().trim_end_matches(['"', '\'', '.']))
            ));
            return;
        }
    }

    if is_fill {
        let mut emitted = false;
        for (keyword, value, default_selector) in FIELD_MAP {
            if action.contains(keyword) {
                let selector = step.selector.as_deref().unwrap_or(default_selector);
                out.push_str(&format!(
                    "    await page.locator({}).first().fill({});\n",
                    js_str(selector),
                    js_str(value)
                ));
                emitted = true;
            }
        }
        if !emitted {
            if let Some(selector) = &step.selector {
                out.push_str(&format!(
                    "    await page.locator({}).first().fill('Test');\n",
                    js_str(selector)
                ));
                emitted = true;
            }
        }
        if emitted {
            return;
        }
    }

    if is_click {
        let selector = click_selector(step, &action);
        out.push_str(&format!(
            "    await page.locator({}).first().click();\n",
            js_str(&selector)
        ));
        out.push_str("    await page.waitForLoadState('networkidle');\n");
        return;
    }

    if is_verify {
        out.push_str("    await page.waitForLoadState('networkidle');\n");
        return;
    }

    // No recognised action; give the page a beat and move on.
    out.push_str("    await page.waitForTimeout(1000);\n");
}

fn click_selector(step: &TestStep, action: &str) -> String {
    if let Some(selector) = &step.selector {
        return selector.clone();
    }
    for (keyword, selector) in CLICK_MAP {
        if action.contains(keyword) {
            return selector.to_string();
        }
    }
    match QUOTED_NAME.captures(&step.action_text) {
        Some(captured) => {
            let name = captured.get(1).map(|m| m.as_str()).unwrap_or("Submit");
            format!("button:has-text(\"{name}\"), text={name}")
        }
        None => "button:has-text(\"Submit\")".to_string(),
    }
}
