//! Template Registry - static content for generated rules and commands
//!
//! Pure lookup keyed by `(category, optional code)`. Rule templates carry
//! their confidence constants; command templates are opaque document blobs
//! the engine never interprets or executes.

use chrono::{DateTime, Utc};

/// A guidance sentence plus the constants for its confidence curve.
#[derive(Debug, Clone, Copy)]
pub struct RuleTemplate {
    pub text: &'static str,
    /// Confidence ceiling
    pub cap: f64,
    /// Occurrences needed to reach confidence 1.0 before capping
    pub normalizer: f64,
}

const ERROR_CAP: f64 = 0.9;
const ERROR_NORMALIZER: f64 = 10.0;

/// Code-specific TypeScript guidance.
const TYPESCRIPT_CODE_RULES: &[(&str, &str)] = &[
    ("TS2322", "- Always provide explicit type annotations when TypeScript cannot infer types correctly."),
    ("TS2345", "- Ensure function arguments match the expected parameter types exactly."),
    ("TS2339", "- Verify property names and consider using optional chaining (?.) for potentially undefined objects."),
    ("TS2304", "- Import all required types and modules before using them."),
    ("TS2571", "- Use type assertions (as Type) only when you're certain about the type."),
];

/// Family-level fallbacks when no specific code is extractable.
const ERROR_FAMILY_RULES: &[(&str, &str)] = &[
    ("syntax_error", "- Review syntax carefully and use proper linting tools to catch errors early."),
    ("type_error", "- Add type checking and validation for function parameters and return values."),
    ("eslint_error", "- Follow ESLint rules consistently and configure auto-fix for common issues."),
    ("npm_error", "- Clear the package cache and reinstall dependencies when encountering persistent package issues."),
    ("test_failure", "- Review test assertions and ensure test data matches expected formats."),
    ("module_not_found", "- Verify import paths are correct and all dependencies are installed."),
    ("permission_error", "- Check file permissions and ensure the user has appropriate access rights."),
];

/// Rule template for an error family and optional extracted code. A family
/// with neither a code match nor a fallback yields no template, and the
/// classifier emits nothing for it.
pub fn error_rule_template(family: &str, code: Option<&str>) -> Option<RuleTemplate> {
    let text = match (family, code) {
        ("typescript_error", Some(code)) => TYPESCRIPT_CODE_RULES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, text)| *text),
        _ => None,
    }
    .or_else(|| {
        ERROR_FAMILY_RULES
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, text)| *text)
    })?;

    Some(RuleTemplate {
        text,
        cap: ERROR_CAP,
        normalizer: ERROR_NORMALIZER,
    })
}

/// Workflow guidance keyed by slash command.
const WORKFLOW_RULES: &[(&str, &str)] = &[
    ("/test", "- Run tests frequently during development to catch issues early."),
    ("/review", "- Use code review commands to maintain quality standards."),
    ("/build", "- Build the project after significant changes to verify compilation."),
    ("/lint", "- Run linting before committing code to maintain consistency."),
    ("/format", "- Apply consistent formatting across the codebase."),
    ("/docs", "- Keep documentation updated alongside code changes."),
    ("/deploy", "- Follow deployment procedures and verify in staging first."),
    ("/debug", "- Use systematic debugging approaches to isolate issues."),
    ("/optimize", "- Profile before optimizing to identify actual bottlenecks."),
    ("/refactor", "- Refactor in small, testable increments."),
];

pub fn workflow_rule_template(command: &str) -> Option<RuleTemplate> {
    WORKFLOW_RULES
        .iter()
        .find(|(c, _)| *c == command)
        .map(|(_, text)| RuleTemplate {
            text,
            cap: 0.8,
            normalizer: 20.0,
        })
}

/// Technology-specific guidance for a dominant file-type group.
#[derive(Debug, Clone, Copy)]
pub struct TechnologyRule {
    pub category: &'static str,
    pub text: &'static str,
    pub confidence: f64,
}

const TECHNOLOGY_RULES: &[TechnologyRule] = &[
    TechnologyRule {
        category: "TypeScript",
        text: "- Use strict TypeScript configuration and enable all recommended compiler options.",
        confidence: 0.8,
    },
    TechnologyRule {
        category: "Python",
        text: "- Follow PEP 8 style guidelines and use type hints for better code clarity.",
        confidence: 0.8,
    },
    TechnologyRule {
        category: "JavaScript",
        text: "- Use ESLint and Prettier for consistent code formatting and quality.",
        confidence: 0.8,
    },
];

pub fn technology_rule(category: &str) -> Option<TechnologyRule> {
    TECHNOLOGY_RULES.iter().find(|r| r.category == category).copied()
}

/// A generated workflow-command document.
#[derive(Debug, Clone, Copy)]
pub struct CommandTemplate {
    /// Stable artifact slug
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    /// Synopsis, arguments, and recipe; opaque to the engine
    pub body: &'static str,
}

pub fn command_template(slug: &str) -> Option<&'static CommandTemplate> {
    COMMAND_TEMPLATES.iter().find(|t| t.slug == slug)
}

/// `typescript_error` → `Typescript Error`
pub fn title_case_family(family: &str) -> String {
    family
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a command artifact: frontmatter header plus the template body.
pub fn render_command_artifact(
    template: &CommandTemplate,
    confidence: f64,
    evidence: &str,
    now: DateTime<Utc>,
) -> String {
    format!(
        "---\nname: {name}\ndescription: {description}\ncategory: {category}\nconfidence: {confidence:.2}\nevidence: {evidence}\ngenerated: {generated}\n---\n\n{body}",
        name = template.name,
        description = template.description,
        category = template.category,
        confidence = confidence,
        evidence = evidence,
        generated = now.format("%Y-%m-%dT%H:%M:%SZ"),
        body = template.body,
    )
}

const COMMAND_TEMPLATES: &[CommandTemplate] = &[
    CommandTemplate {
        slug: "smart-test",
        name: "smart-test",
        description: "Run the test suite with coverage and automatic snapshot updates",
        category: "testing",
        body: r#"## smart-test

Run the project's test suite with coverage reporting and automatic snapshot
updates, then summarize results.

**Usage:** `/smart-test [pattern]`

**Arguments:**
- `pattern` (optional): test file pattern to narrow the run

**Recipe:**

```bash
# Run all tests with coverage
npm run test -- --coverage --updateSnapshot

# If a pattern was provided, run the matching tests only
if [ -n "$1" ]; then
    npm run test -- --testPathPattern="$1" --coverage --updateSnapshot
fi

# Coverage summary
npm run test:coverage
```
"#,
    },
    CommandTemplate {
        slug: "debug-helper",
        name: "debug-helper",
        description: "Systematic debugging workflow with diagnostics per error family",
        category: "debugging",
        body: r#"## debug-helper

Structured debugging pass: inspect recent failures, then run diagnostics for
the selected error family.

**Usage:** `/debug-helper [error_type]`

**Arguments:**
- `error_type` (optional): family to focus on (ts, npm)

**Recipe:**

```bash
echo "Recent error-related commits:"
git log --oneline -10 | grep -i "fix\|error\|bug" || echo "none"

case "$1" in
  ts)
    npx tsc --noEmit
    ;;
  npm)
    npm doctor
    npm audit
    ;;
  *)
    npm ls --depth=0 | grep MISSING || echo "all dependencies present"
    npx tsc --noEmit --skipLibCheck
    ;;
esac
```
"#,
    },
    CommandTemplate {
        slug: "safe-refactor",
        name: "safe-refactor",
        description: "Refactor with a test baseline and a restorable backup",
        category: "refactoring",
        body: r#"## safe-refactor

Establish a passing test baseline and a restorable stash before refactoring a
target file or directory.

**Usage:** `/safe-refactor <file_or_directory>`

**Arguments:**
- `file_or_directory`: refactor target (required)

**Recipe:**

```bash
if [ -z "$1" ]; then
    echo "specify a file or directory to refactor" >&2
    exit 1
fi

# Baseline must be green before touching anything
npm test || { echo "tests failing; fix them before refactoring" >&2; exit 1; }

git stash push -m "Pre-refactor backup: $1"
echo "Ready to refactor $1. Run tests again after changes."
echo "Restore the backup with: git stash pop"
```
"#,
    },
    CommandTemplate {
        slug: "ts-check",
        name: "ts-check",
        description: "TypeScript type checking with optional auto-fixes",
        category: "typescript",
        body: r#"## ts-check

Run TypeScript type checking across the project, optionally applying ESLint
auto-fixes.

**Usage:** `/ts-check [--fix]`

**Arguments:**
- `--fix` (optional): apply automatic fixes where possible

**Recipe:**

```bash
npx tsc --noEmit --skipLibCheck

if [ "$1" = "--fix" ]; then
    npx tsc --noEmit 2>&1 | grep "Cannot find name" | while read -r line; do
        echo "consider importing: $line"
    done
    npx eslint . --ext .ts,.tsx --fix
fi
```
"#,
    },
    CommandTemplate {
        slug: "py-lint",
        name: "py-lint",
        description: "Python linting, formatting, and type checking",
        category: "python",
        body: r#"## py-lint

Run Python code-quality checks: formatting, linting, and type checking when
the tools are available.

**Usage:** `/py-lint [--fix]`

**Arguments:**
- `--fix` (optional): apply formatting fixes in place

**Recipe:**

```bash
command -v black >/dev/null || echo "black not found (pip install black)" >&2
command -v flake8 >/dev/null || echo "flake8 not found (pip install flake8)" >&2

if [ "$1" = "--fix" ]; then
    black .
    isort .
else
    black --check .
    flake8 .
    command -v mypy >/dev/null && mypy .
fi
```
"#,
    },
    CommandTemplate {
        slug: "fix-ts-errors",
        name: "fix-ts-errors",
        description: "Analyze TypeScript compiler errors and suggest fixes per code",
        category: "debugging",
        body: r#"## fix-ts-errors

Run the TypeScript compiler, list the errors found, and point at the standard
fix for each recurring diagnostic code.

**Usage:** `/fix-ts-errors`

**Recipe:**

```bash
TSC_OUTPUT=$(npx tsc --noEmit 2>&1)

if [ $? -eq 0 ]; then
    echo "no TypeScript errors"
    exit 0
fi

echo "$TSC_OUTPUT"
echo ""
echo "Common fixes:"
echo "  TS2322 (type assignment): add explicit type annotations"
echo "  TS2339 (missing property): check spelling or use optional chaining (?.)"
echo "  TS2345 (argument type): verify function parameter types"
echo "  TS2304 (cannot find name): add the missing import"
```
"#,
    },
    CommandTemplate {
        slug: "fix-deps",
        name: "fix-deps",
        description: "Fix dependency and module resolution issues",
        category: "debugging",
        body: r#"## fix-deps

Reset the dependency tree: clear caches, reinstall, and audit.

**Usage:** `/fix-deps`

**Recipe:**

```bash
npm cache clean --force
rm -rf node_modules package-lock.json
npm install
npm audit
npm audit fix

echo "If issues persist, check that import paths are correct and every"
echo "required dependency is declared in package.json."
```
"#,
    },
    CommandTemplate {
        slug: "smart-commit",
        name: "smart-commit",
        description: "Analyze staged changes and suggest a conventional commit message",
        category: "git",
        body: r#"## smart-commit

Inspect staged files and suggest a conventional commit type and message shape.

**Usage:** `/smart-commit [type]`

**Arguments:**
- `type` (optional): override the suggested commit type (feat, fix, docs, ...)

**Recipe:**

```bash
git status --short
STAGED_FILES=$(git diff --cached --name-only)

if [ -z "$STAGED_FILES" ]; then
    echo "no files staged; stage files first with git add" >&2
    exit 1
fi

if echo "$STAGED_FILES" | grep -q "test\|spec"; then
    SUGGESTED_TYPE="test"
elif echo "$STAGED_FILES" | grep -q "README\|\.md"; then
    SUGGESTED_TYPE="docs"
elif echo "$STAGED_FILES" | grep -q "package\.json\|Cargo\.toml\|lock"; then
    SUGGESTED_TYPE="chore"
else
    SUGGESTED_TYPE="feat"
fi

COMMIT_TYPE=${1:-$SUGGESTED_TYPE}
echo "suggested: $COMMIT_TYPE: <description>"
```
"#,
    },
];
