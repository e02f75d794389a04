//! 结果渲染 - 业务能力层
//!
//! 把结果日志拼成一份可下载的 HTML：markdown 表格 + MathJax 公式。
//! 纯函数，不访问网络，不读写文件。

use pulldown_cmark::{html, CowStr, Event, Options, Parser};

/// 结果片段之间的分隔
const SEPARATOR: &str = "\n\n";

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8">
<title>Exam analogue analysis</title>
<script>MathJax={tex:{inlineMath:[['$','$']],displayMath:[['$$','$$']]},svg:{fontCache:'global'}};</script>
<script async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
<style>
body{font-family:'Malgun Gothic','Noto Sans',sans-serif;padding:40px;line-height:1.6}
table{border-collapse:collapse;width:100%;table-layout:fixed;margin-bottom:30px}
th,td{border:1px solid #ddd;padding:15px;vertical-align:top;word-wrap:break-word}
th{background:#007bff;color:white;text-align:center}
</style>
</head><body>
"#;

const HTML_TAIL: &str = "</body></html>\n";

/// 拼接结果日志并转换为完整 HTML 文档
pub fn render_html(results: &[String]) -> Vec<u8> {
    let combined = results.join(SEPARATOR);
    let body = markdown_to_html(&combined);

    let mut document = String::with_capacity(HTML_HEAD.len() + body.len() + HTML_TAIL.len());
    document.push_str(HTML_HEAD);
    document.push_str(&body);
    document.push_str(HTML_TAIL);
    document.into_bytes()
}

/// markdown 转 HTML
///
/// 公式原样保留 `$...$` / `$$...$$` 定界符交给 MathJax，
/// 避免下划线、星号被当成强调语法
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_MATH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::InlineMath(tex) => Event::Text(CowStr::from(format!("${}$", tex))),
        Event::DisplayMath(tex) => Event::Text(CowStr::from(format!("$${}$$", tex))),
        other => other,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}
