//! Bootstrap runtime code generation

use std::collections::BTreeMap;

use anyhow::Result;

use super::compilation::{Compilation, DEFAULT_CHUNK_FILENAME};
use super::template;

/// Runtime variable holding the id of the chunk being loaded
pub const CHUNK_ID_VAR: &str = "chunkId";

/// Runtime expression holding the public path prefix
pub const PUBLIC_PATH_EXPR: &str = "__webpack_require__.p";

/// Helper the modern loader routes script URLs through
pub const SCRIPT_SRC_HELPER: &str = "jsonpScriptSrc";

/// How the generated loader computes a chunk's script URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderShape {
    /// `script.src = <public path> + <path expression>;`
    Inline,
    /// `script.src = jsonpScriptSrc(chunkId);` with the helper declared alongside
    ScriptSrcHelper,
}

/// Start of the chunk loading function body
pub fn require_ensure_prelude() -> String {
    format!(
        r#"var installedChunkData = installedChunks[{id}];
if (installedChunkData === 0) {{
  return Promise.resolve();
}}
"#,
        id = CHUNK_ID_VAR
    )
}

/// Expression computing the path of the chunk being loaded.
///
/// A templated naming pattern is resolved for every async chunk and embedded as
/// an inline lookup. A static pattern is embedded as a string literal.
pub fn chunk_path_expression(compilation: &Compilation) -> Result<String> {
    let template = compilation
        .output
        .chunk_filename
        .as_deref()
        .or(compilation.output.filename.as_deref())
        .unwrap_or(DEFAULT_CHUNK_FILENAME);

    if !template::is_templated(template) {
        return Ok(serde_json::to_string(template)?);
    }

    let paths: BTreeMap<String, String> = compilation
        .chunks
        .async_chunks()
        .into_iter()
        .map(|id| {
            let path = compilation.asset_path(template, Some(&id));
            (id, path)
        })
        .collect();

    Ok(format!("{}[{}]", serde_json::to_string(&paths)?, CHUNK_ID_VAR))
}

/// JSONP script loading code appended to the loader source
pub fn jsonp_loader(compilation: &Compilation, shape: LoaderShape) -> Result<String> {
    let path = chunk_path_expression(compilation)?;

    let mut code = format!(
        r#"var promise = new Promise(function(resolve, reject) {{
  installedChunkData = installedChunks[{id}] = [resolve, reject];
}});
"#,
        id = CHUNK_ID_VAR
    );

    let src = match shape {
        LoaderShape::Inline => format!("{} + {}", PUBLIC_PATH_EXPR, path),
        LoaderShape::ScriptSrcHelper => {
            code.push_str(&format!(
                "var {helper} = function({id}) {{\n  return {public} + {path};\n}};\n",
                helper = SCRIPT_SRC_HELPER,
                id = CHUNK_ID_VAR,
                public = PUBLIC_PATH_EXPR,
                path = path
            ));
            format!("{}({})", SCRIPT_SRC_HELPER, CHUNK_ID_VAR)
        }
    };

    code.push_str(&format!(
        r#"var script = document.createElement('script');
script.charset = 'utf-8';
script.src = {src};
document.head.appendChild(script);
return promise;
"#,
        src = src
    ));

    Ok(code)
}

/// Full bootstrap for a runtime chunk, wrapping the transformed loader source
pub fn render_bootstrap(compilation: &Compilation, chunk_id: &str, loader: &str) -> Result<String> {
    let chunk_source = compilation
        .chunks
        .get(chunk_id)
        .map(|c| c.source.as_str())
        .unwrap_or_default();

    let indented: String = loader
        .lines()
        .map(|line| format!("    {}\n", line))
        .collect();

    Ok(format!(
        r#"// Bootstrap runtime
(function() {{
  var installedChunks = {{ {id}: 0 }};
  var __webpack_modules__ = {{}};

  function __webpack_require__(moduleId) {{
    return __webpack_modules__[moduleId];
  }}

  __webpack_require__.e = function requireEnsure({var}) {{
{loader}  }};

  {public} = {public_path};

  window.webpackJsonp = function(chunkIds, modules) {{
    chunkIds.forEach(function(id) {{
      var data = installedChunks[id];
      installedChunks[id] = 0;
      if (data) data[0]();
    }});
    Object.assign(__webpack_modules__, modules);
  }};
  window.__webpack_require__ = __webpack_require__;
}})();
{source}
"#,
        id = serde_json::to_string(chunk_id)?,
        var = CHUNK_ID_VAR,
        loader = indented,
        public = PUBLIC_PATH_EXPR,
        public_path = serde_json::to_string(&compilation.output.public_path)?,
        source = chunk_source,
    ))
}

/// Script wrapper for an async chunk file
pub fn render_async_chunk(chunk_id: &str, source: &str) -> Result<String> {
    Ok(format!(
        "window.webpackJsonp([{}], {{\n{}\n}});\n",
        serde_json::to_string(chunk_id)?,
        source
    ))
}

/// HTML page including inline head snippets and entry scripts
pub fn render_html(js: &[String], head: &BTreeMap<String, String>) -> String {
    let head: String = head
        .values()
        .map(|snippet| format!("    {}\n", snippet))
        .collect();
    let scripts: String = js
        .iter()
        .map(|src| format!("    <script src=\"{}\"></script>\n", src))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
{head}  </head>
  <body>
{scripts}  </body>
</html>
"#,
        head = head,
        scripts = scripts
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{Chunk, ChunkGraph, OutputOptions};

    fn compilation(chunk_filename: Option<&str>) -> Compilation {
        let mut graph = ChunkGraph::new();
        graph.add_chunk(Chunk::entry("0", "main", "").with_child("1"));
        graph.add_chunk(Chunk::async_chunk("1", "").named("lazy"));
        let output = OutputOptions {
            chunk_filename: chunk_filename.map(str::to_string),
            ..OutputOptions::default()
        };
        let mut compilation = Compilation::new(1, output, graph);
        compilation.seal();
        compilation
    }

    #[test]
    fn test_templated_path_is_inlined() {
        let c = compilation(Some("[name].js"));
        assert_eq!(chunk_path_expression(&c).unwrap(), r#"{"1":"lazy.js"}[chunkId]"#);
    }

    #[test]
    fn test_static_path_is_a_literal() {
        let c = compilation(Some("__CHUNK_MANIFEST__"));
        assert_eq!(chunk_path_expression(&c).unwrap(), r#""__CHUNK_MANIFEST__""#);
    }

    #[test]
    fn test_loader_shapes() {
        let c = compilation(Some("[id].js"));

        let inline = jsonp_loader(&c, LoaderShape::Inline).unwrap();
        assert!(inline.contains(r#"script.src = __webpack_require__.p + {"1":"1.js"}[chunkId];"#));

        let helper = jsonp_loader(&c, LoaderShape::ScriptSrcHelper).unwrap();
        assert!(helper.contains("var jsonpScriptSrc = function(chunkId) {"));
        assert!(helper.contains("script.src = jsonpScriptSrc(chunkId);"));
    }
}
