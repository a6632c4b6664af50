//! JavaScript injected into the browser surface after each page load.
//!
//! The script wraps `fetch` and `XMLHttpRequest`, classifies successful
//! responses with regexes equivalent to [`EndpointPatterns::classify`] and
//! posts JSON envelopes (see [`crate::bridge::Envelope`]) to the native bridge
//! object. Fetch responses are cloned before reading, so the page still
//! consumes the original stream.

use indoc::formatdoc;

use super::EndpointPatterns;

fn escape_regex(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len() * 2);
    for c in literal.chars() {
        if "\\^$.|?*+()[]{}/".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn js_string(value: &str) -> String {
    // serde_json's string encoding is a valid JS string literal.
    serde_json::Value::String(value.to_string()).to_string()
}

pub(crate) fn list_pattern_source(patterns: &EndpointPatterns) -> String {
    format!(
        r"^[^?#]*{}/?(?:[?#].*)?$",
        escape_regex(&patterns.list_path)
    )
}

pub(crate) fn complete_pattern_source(patterns: &EndpointPatterns) -> String {
    format!(
        r"^[^?#]*/([0-9]+)/{}/?(?:[?#].*)?$",
        escape_regex(&patterns.complete_action)
    )
}

/// Build the interceptor script posting to `window[bridge_name]`.
pub fn interceptor_script(patterns: &EndpointPatterns, bridge_name: &str) -> String {
    let list_re = js_string(&list_pattern_source(patterns));
    let complete_re = js_string(&complete_pattern_source(patterns));
    let bridge = js_string(bridge_name);

    formatdoc! {r#"
        (function () {{
          if (window.__choreBridgeInstalled) {{ return; }}
          window.__choreBridgeInstalled = true;

          var LIST_RE = new RegExp({list_re});
          var COMPLETE_RE = new RegExp({complete_re});

          function post(message) {{
            try {{
              var bridge = window[{bridge}];
              if (bridge && typeof bridge.postMessage === 'function') {{
                bridge.postMessage(JSON.stringify(message));
              }}
            }} catch (e) {{
              console.warn('chore bridge: post failed', e);
            }}
          }}

          function absolute(url) {{
            try {{ return new URL(String(url), window.location.href).href; }}
            catch (e) {{ return String(url); }}
          }}

          function handle(url, readBody) {{
            var href = absolute(url);
            if (LIST_RE.test(href)) {{
              readBody()
                .then(function (body) {{ post({{ kind: 'list_received', body: body }}); }})
                .catch(function (e) {{ console.warn('chore bridge: body read failed', e); }});
              return;
            }}
            var match = COMPLETE_RE.exec(href);
            if (match) {{
              post({{ kind: 'task_completed', id: Number(match[1]) }});
            }}
          }}

          var originalFetch = window.fetch;
          if (typeof originalFetch === 'function') {{
            window.fetch = function (input) {{
              var url = (input && typeof input === 'object' && 'url' in input) ? input.url : input;
              return originalFetch.apply(this, arguments).then(function (response) {{
                try {{
                  if (response.ok) {{
                    handle(url, function () {{ return response.clone().text(); }});
                  }}
                }} catch (e) {{
                  console.warn('chore bridge: fetch observe failed', e);
                }}
                return response;
              }});
            }};
          }}

          var originalOpen = XMLHttpRequest.prototype.open;
          XMLHttpRequest.prototype.open = function (method, url) {{
            this.__choreBridgeUrl = url;
            return originalOpen.apply(this, arguments);
          }};

          var originalSend = XMLHttpRequest.prototype.send;
          XMLHttpRequest.prototype.send = function () {{
            var xhr = this;
            xhr.addEventListener('load', function () {{
              try {{
                if (xhr.status >= 200 && xhr.status < 300) {{
                  handle(xhr.responseURL || xhr.__choreBridgeUrl, function () {{
                    var textual = xhr.responseType === '' || xhr.responseType === 'text';
                    return Promise.resolve(textual ? xhr.responseText : JSON.stringify(xhr.response));
                  }});
                }}
              }} catch (e) {{
                console.warn('chore bridge: xhr observe failed', e);
              }}
            }});
            return originalSend.apply(this, arguments);
          }};
        }})();
        "#,
        list_re = list_re,
        complete_re = complete_re,
        bridge = bridge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::TrafficClass;

    #[test]
    fn list_pattern_is_anchored_to_path_end() {
        let src = list_pattern_source(&EndpointPatterns::default());
        assert_eq!(src, r"^[^?#]*\/api\/v1\/chores/?(?:[?#].*)?$");
    }

    #[test]
    fn complete_pattern_captures_id() {
        let src = complete_pattern_source(&EndpointPatterns::default());
        assert_eq!(src, r"^[^?#]*/([0-9]+)/do/?(?:[?#].*)?$");
    }

    /// Classify `href` the way the injected script does: list first, then
    /// completion. Ids that do not fit an i64 are dropped when the bridge
    /// decodes the envelope, so they count as ignored.
    fn script_classify(patterns: &EndpointPatterns, href: &str) -> TrafficClass {
        let list_re = regex::Regex::new(&list_pattern_source(patterns)).unwrap();
        let complete_re = regex::Regex::new(&complete_pattern_source(patterns)).unwrap();
        if list_re.is_match(href) {
            return TrafficClass::List;
        }
        complete_re
            .captures(href)
            .and_then(|c| c[1].parse().ok())
            .map_or(TrafficClass::Ignore, |id| TrafficClass::Complete { id })
    }

    #[test]
    fn script_patterns_agree_with_native_classifier() {
        // The script resolves relative URLs against the page before matching.
        let hrefs = [
            "https://chores.example.com/api/v1/chores",
            "https://chores.example.com/api/v1/chores/",
            "https://chores.example.com/api/v1/chores/?limit=10",
            "https://chores.example.com/api/v1/chores?x=1#frag",
            "https://host/sub/api/v1/chores/",
            "https://host/api/v1/chores/history",
            "https://host/api/v1/chores/12",
            "https://host/api/v1/chores/12/history",
            "https://host/api/v1/choresX",
            "https://host/api/v1/chores/42/do",
            "https://chores.example.com/api/v1/chores/7/do?completedDate=2024",
            "https://host/api/v1/chores/7/do/",
            "https://host/api/v1/chores/abc/do",
            "https://host/api/v1/chores/-1/do",
            "https://host/api/v1/chores/42/skip",
            "https://host/api/v1/chores/99999999999999999999/do",
            "https://host/api/v1/users/me",
        ];

        for patterns in [EndpointPatterns::default(), EndpointPatterns::new("tasks/", "/complete/")] {
            for href in hrefs.iter().copied().chain([
                "https://h/tasks",
                "https://h/tasks/?page=2",
                "https://h/tasks/3/complete",
                "https://h/tasks/3/complete/",
                "https://h/tasks.json",
            ]) {
                assert_eq!(
                    script_classify(&patterns, href),
                    patterns.classify(href),
                    "{href} with {patterns:?}"
                );
            }
        }
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        assert_eq!(escape_regex("a.b(c)"), r"a\.b\(c\)");
    }

    #[test]
    fn script_embeds_patterns_and_bridge_name() {
        let script = interceptor_script(&EndpointPatterns::default(), "ChoreBridge");
        assert!(script.starts_with("(function () {"));
        assert!(script.contains(r#"window["ChoreBridge"]"#));
        assert!(script.contains(r#"new RegExp("^[^?#]*\\/api\\/v1\\/chores/?(?:[?#].*)?$")"#));
        assert!(script.contains("window.__choreBridgeInstalled = true;"));
        assert!(script.contains("response.clone().text()"));
        assert!(script.contains("XMLHttpRequest.prototype.send"));
        assert!(script.contains("kind: 'list_received'"));
        assert!(script.contains("kind: 'task_completed'"));
    }

    #[test]
    fn bridge_name_is_quoted_safely() {
        let script = interceptor_script(&EndpointPatterns::default(), "x\"];alert(1);//");
        assert!(script.contains(r#"window["x\"];alert(1);//"]"#));
    }
}
