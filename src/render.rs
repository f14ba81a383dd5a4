//! Renders template values to disk with [`minijinja`]. Templates are loaded
//! from the source directory on first use and kept for the rest of the build.

use crate::date;
use minijinja::{path_loader, AutoEscape, Environment, Value};
use std::io;
use std::path::{Path, PathBuf};

/// The template environment of a site.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Creates an environment loading templates from `directory`. Output is
    /// not auto-escaped: page bodies are already HTML, and templates that
    /// want escaping ask for it.
    pub fn new(directory: impl AsRef<Path>) -> Templates {
        let mut env = Environment::new();
        env.set_loader(path_loader(directory.as_ref().to_owned()));
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("strftime", strftime);
        Templates { env }
    }

    /// Forgets every loaded template so edited templates are picked up.
    pub fn clear(&mut self) {
        self.env.clear_templates();
    }

    /// Applies the template `name` (relative to the template directory) to
    /// `value` and writes the result to `out`, creating parent directories as
    /// needed.
    pub fn render(&self, name: &Path, value: Value, out: &Path) -> Result<()> {
        let template_error = |err| Error::Template {
            name: name.to_owned(),
            err,
        };
        let template = self
            .env
            .get_template(&template_name(name))
            .map_err(template_error)?;
        let rendered = template.render(value).map_err(template_error)?;

        if let Some(dir) = out.parent() {
            std::fs::create_dir_all(dir).map_err(|err| Error::Write {
                path: dir.to_owned(),
                err,
            })?;
        }
        std::fs::write(out, rendered).map_err(|err| Error::Write {
            path: out.to_owned(),
            err,
        })
    }
}

/// Template names always use forward slashes.
fn template_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `{{ date | strftime }}` or `{{ date | strftime("%d.%m.%Y") }}`. Formats a
/// page date (as exposed in page contexts); defaults to `%Y %B %d`.
fn strftime(
    value: String,
    format: Option<String>,
) -> std::result::Result<String, minijinja::Error> {
    let parsed = date::from_front_matter(&serde_yaml::Value::String(value.clone()));
    match parsed {
        Some(dt) => Ok(dt
            .format(format.as_deref().unwrap_or(date::DISPLAY_FORMAT))
            .to_string()),
        None => Err(minijinja::Error::new(
            minijinja::ErrorKind::InvalidOperation,
            format!("strftime: '{}' is not a date", value),
        )),
    }
}

/// The result of a fallible rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a template is missing, fails to parse, or fails to
    /// render.
    #[error("template '{}': {err}", .name.display())]
    Template {
        name: PathBuf,
        #[source]
        err: minijinja::Error,
    },

    /// Returned for I/O problems writing the output.
    #[error("writing '{}': {err}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;

    fn templates(files: &[(&str, &str)]) -> (tempfile::TempDir, Templates) {
        let dir = tempfile::tempdir().unwrap();
        for (path, contents) in files {
            let path = dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        let templates = Templates::new(dir.path());
        (dir, templates)
    }

    #[test]
    fn test_render() -> Result<()> {
        let (dir, templates) = templates(&[(
            "_templates/index.html",
            "<h1>{{ title }}</h1>{% for item in items %}<li>{{ item }}</li>{% endfor %}",
        )]);
        let mut value: BTreeMap<String, Value> = BTreeMap::new();
        value.insert("title".to_owned(), Value::from("<Hi>"));
        value.insert("items".to_owned(), vec![Value::from("a"), Value::from("b")].into());

        let out = dir.path().join("build/nested/index.html");
        templates.render(Path::new("_templates/index.html"), Value::from(value), &out)?;
        assert_eq!(
            "<h1><Hi></h1><li>a</li><li>b</li>",
            std::fs::read_to_string(out).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_parent_template_inheritance() -> Result<()> {
        let (dir, templates) = templates(&[
            ("_templates/base.html", "<main>{% block body %}{% endblock %}</main>"),
            (
                "_templates/posts.html",
                "{% extends \"_templates/base.html\" %}{% block body %}{{ post_content_html }}{% endblock %}",
            ),
        ]);
        let mut value: BTreeMap<String, Value> = BTreeMap::new();
        value.insert("post_content_html".to_owned(), Value::from("<p>x</p>"));
        let out = dir.path().join("out.html");
        templates.render(Path::new("_templates/posts.html"), Value::from(value), &out)?;
        assert_eq!("<main><p>x</p></main>", std::fs::read_to_string(out).unwrap());
        Ok(())
    }

    #[test]
    fn test_strftime() -> Result<()> {
        let (dir, templates) = templates(&[(
            "t.html",
            "{{ date | strftime }}|{{ date | strftime(\"%d.%m.%Y\") }}",
        )]);
        let mut value: BTreeMap<String, Value> = BTreeMap::new();
        value.insert("date".to_owned(), Value::from("2025-02-03"));
        let out = dir.path().join("out.html");
        templates.render(Path::new("t.html"), Value::from(value), &out)?;
        assert_eq!(
            "2025 February 03|03.02.2025",
            std::fs::read_to_string(out).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_strftime_time_of_day() -> Result<()> {
        let (dir, templates) = templates(&[("t.html", "{{ date | strftime(\"%H:%M\") }}")]);
        let mut value: BTreeMap<String, Value> = BTreeMap::new();
        value.insert("date".to_owned(), Value::from("2025-01-01 08:30:00"));
        let out = dir.path().join("out.html");
        templates.render(Path::new("t.html"), Value::from(value), &out)?;
        assert_eq!("08:30", std::fs::read_to_string(out).unwrap());
        Ok(())
    }

    #[test]
    fn test_missing_template() {
        let (dir, templates) = templates(&[]);
        let result = templates.render(
            Path::new("_templates/posts.html"),
            Value::from(()),
            &dir.path().join("out.html"),
        );
        assert!(matches!(result, Err(Error::Template { .. })));
    }
}
