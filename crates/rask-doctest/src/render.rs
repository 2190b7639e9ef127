// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Page fragments: the highlighted snippet and the shell transcript.

use std::io::{self, Write};

use rask_highlight::{escape_html, escape_html_into, highlight, render_html};

use crate::record::{ExecutionRecord, Termination};

/// Write `source` as a highlighted code figure captioned with `file_name`.
pub fn write_code_figure(out: &mut dyn Write, file_name: &str, source: &[u8]) -> io::Result<()> {
    let tokens = highlight(source);
    writeln!(
        out,
        "<figure><figcaption class=\"rask-cap\"><cite class=\"file\">{}</cite></figcaption>\
         <pre><code class=\"rask\">{}</code></pre></figure>",
        escape_html(file_name),
        render_html(source, &tokens)
    )
}

/// Write the commands that were run and what they printed.
pub fn write_transcript(out: &mut dyn Write, records: &[ExecutionRecord]) -> io::Result<()> {
    let mut body = String::new();
    for record in records {
        body.push_str("$ ");
        escape_html_into(&record.argv.join(" "), &mut body);
        body.push('\n');
        push_output(&mut body, &record.stdout);
        push_output(&mut body, &record.stderr);
        if record.termination == Termination::TimedOut {
            body.push_str("(timed out)\n");
        }
    }

    writeln!(
        out,
        "<figure><figcaption class=\"shell-cap\">Shell</figcaption>\
         <pre><code class=\"shell\">{}</code></pre></figure>",
        body
    )
}

fn push_output(body: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    escape_html_into(text, body);
    if !text.ends_with('\n') {
        body.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(argv: &[&str], stdout: &str, stderr: &str) -> ExecutionRecord {
        ExecutionRecord {
            argv: argv.iter().map(|s| s.to_string()).collect(),
            termination: Termination::Failure { code: Some(1) },
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            artifact: None,
        }
    }

    fn written(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn code_figure_is_captioned_and_highlighted() {
        let html = written(|out| write_code_figure(out, "hello.rk", b"func main() { }"));
        assert!(html.starts_with(
            "<figure><figcaption class=\"rask-cap\"><cite class=\"file\">hello.rk</cite>\
             </figcaption><pre><code class=\"rask\">"
        ));
        assert!(html.contains("<span class=\"tok-kw\">func</span>"));
        assert!(html.ends_with("</code></pre></figure>\n"));
    }

    #[test]
    fn transcript_lists_commands_and_escaped_output() {
        let records = [
            record(&["rask", "compile", "hello.rk", "-o", "hello"], "", ""),
            record(&["./hello"], "1 < 2\n", "panic: <boom>"),
        ];
        let html = written(|out| write_transcript(out, &records));
        assert!(html.contains(
            "$ rask compile hello.rk -o hello\n$ ./hello\n1 &lt; 2\npanic: &lt;boom&gt;\n"
        ));
    }

    #[test]
    fn timed_out_invocation_is_marked() {
        let mut hung = record(&["./spin"], "", "");
        hung.termination = Termination::TimedOut;
        let html = written(|out| write_transcript(out, &[hung]));
        assert!(html.contains("$ ./spin\n(timed out)\n"));
    }
}
