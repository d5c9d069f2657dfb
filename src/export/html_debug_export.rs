use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::geometry::BBox;
use crate::core::model::{ClusterReport, Detection, EnsembleResult};
use crate::export::Exporter;

/// Overlay of regions and raw detections on top of the source image.
#[derive(Debug, Clone)]
pub struct HtmlDebugExporter {
    out_dir: PathBuf,
}

impl HtmlDebugExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn region_to_div(cluster: &ClusterReport) -> Option<String> {
        let bbox = cluster.bbox?;
        let candidates = cluster
            .candidates
            .iter()
            .map(|c| format!("{} ({:.3}, {})", c.text, c.score, c.engines.join("+")))
            .collect::<Vec<_>>()
            .join(" | ");
        let state = if cluster.outcome.is_empty() {
            "empty"
        } else {
            "voted"
        };
        Some(format!(
            r#"<div class='bbox region {state}' style='{style}' data-index='{index}' data-winner='{winner}' data-confidence='{conf:.3}' data-candidates='{candidates}'></div>"#,
            style = box_style(&bbox),
            index = cluster.index,
            winner = html_escape::encode_single_quoted_attribute(&cluster.outcome.text),
            conf = cluster.outcome.confidence,
            candidates = html_escape::encode_single_quoted_attribute(&candidates),
        ))
    }

    fn detection_to_div(detection: &Detection, index: usize) -> Option<String> {
        let bbox = detection.bbox?;
        Some(format!(
            r#"<div class='bbox detection' style='{style}' data-index='{index}' data-engine='{engine}' data-text='{text}' data-confidence='{conf:.3}'></div>"#,
            style = box_style(&bbox),
            engine = html_escape::encode_single_quoted_attribute(&detection.engine),
            text = html_escape::encode_single_quoted_attribute(&detection.text),
            conf = detection.confidence,
        ))
    }
}

fn box_style(bbox: &BBox) -> String {
    format!(
        "left:{x0}px; top:{y0}px; width:{w}px; height:{h}px;",
        x0 = bbox.x0,
        y0 = bbox.y0,
        w = bbox.width(),
        h = bbox.height()
    )
}

impl Exporter for HtmlDebugExporter {
    fn export(&self, result: &EnsembleResult) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let mut boxes_html = String::new();
        let mut unplaced = Vec::new();
        for cluster in &result.reconciliation.clusters {
            if cluster.fallback {
                unplaced.push(cluster);
                continue;
            }
            for detection in &cluster.detections {
                if let Some(div) = Self::detection_to_div(detection, cluster.index) {
                    boxes_html.push_str(&div);
                }
            }
            if let Some(div) = Self::region_to_div(cluster) {
                boxes_html.push_str(&div);
            }
        }

        let unplaced_html = unplaced
            .iter()
            .flat_map(|cluster| cluster.detections.iter())
            .map(|d| {
                format!(
                    "<li>{} <small>({}, {:.3})</small></li>",
                    html_escape::encode_text(&d.text),
                    html_escape::encode_text(&d.engine),
                    d.confidence
                )
            })
            .collect::<String>();

        let image = result
            .image
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset='utf-8'>
<title>ocrvote clusters</title>
<style>
body {{ margin: 0; font-family: Arial, sans-serif; }}
#canvas {{ position: relative; }}
#canvas img {{ display: block; }}
.bbox {{ position: absolute; box-sizing: border-box; }}
.bbox.detection {{ border: 1px dashed rgba(255,0,0,0.5); }}
.bbox.region {{ border: 2px solid rgba(0,128,0,0.7); background: rgba(0,128,0,0.08); }}
.bbox.region.empty {{ border-color: rgba(128,128,128,0.7); background: rgba(128,128,128,0.08); }}
#info {{ position: fixed; right: 10px; top: 10px; background: #fff; padding: 10px; border: 1px solid #ddd; max-width: 360px; }}
#unplaced {{ position: fixed; right: 10px; bottom: 10px; background: #fff; padding: 10px; border: 1px solid #ddd; font-size: 12px; max-width: 360px; }}
</style>
</head>
<body>
<div id='info'>
<div><b>text:</b> {text}</div>
<div><b>confidence:</b> {confidence:.3} <b>words:</b> {words} <b>time:</b> {time:.3}s</div>
<div id='detail'>Click a region or detection to inspect.</div>
</div>
<div id='unplaced'><b>Without bbox</b><ul>{unplaced}</ul></div>
<div id='canvas'>
<img src='{image}' />
{boxes}
</div>
<script>
const detail = document.getElementById('detail');
for (const el of document.querySelectorAll('.bbox')) {{
  el.addEventListener('click', (ev) => {{
    ev.stopPropagation();
    const d = el.dataset;
    detail.innerHTML = el.classList.contains('region')
      ? `region ${{d.index}}<br/>winner: ${{d.winner}}<br/>confidence: ${{d.confidence}}<br/>candidates: ${{d.candidates}}`
      : `region ${{d.index}}<br/>engine: ${{d.engine}}<br/>text: ${{d.text}}<br/>confidence: ${{d.confidence}}`;
  }});
}}
</script>
</body>
</html>"#,
            text = html_escape::encode_text(result.text()),
            confidence = result.average_confidence(),
            words = result.word_count(),
            time = result.processing_time,
            unplaced = unplaced_html,
            image = html_escape::encode_single_quoted_attribute(&image),
            boxes = boxes_html,
        );

        fs::write(self.out_dir.join("clusters.html"), html)?;
        Ok(())
    }
}
