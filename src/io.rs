use crate::model::{ProposalRequest, ProposalResponse};
use anyhow::Context;
use csv::WriterBuilder;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Lecture d'une requête JSON (noms snake_case ou camelCase).
pub fn load_request<P: AsRef<Path>>(path: P) -> anyhow::Result<ProposalRequest> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let request: ProposalRequest = serde_json::from_slice(&data)
        .with_context(|| format!("parsing request {}", path.display()))?;
    Ok(request)
}

/// Écriture atomique : fichier temporaire dans le même répertoire puis rename.
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> anyhow::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("atomic rename to {}", path.display()))?;
    Ok(())
}

/// Export JSON de la réponse complète (jolie mise en forme)
pub fn export_response_json<P: AsRef<Path>>(path: P, response: &ProposalResponse) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(response)?;
    write_atomic(path, &json)
}

/// Export CSV du roster: header `role,workers,start,end,slots,headcount`
pub fn export_roster_csv<P: AsRef<Path>>(path: P, response: &ProposalResponse) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    w.write_record(["role", "workers", "start", "end", "slots", "headcount"])?;
    for a in &response.roster {
        let workers = a
            .workers
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(";");
        w.write_record([
            a.role.clone(),
            workers,
            a.start.to_rfc3339(),
            a.end.to_rfc3339(),
            a.slot_count.to_string(),
            a.headcount.to_string(),
        ])?;
    }
    let bytes = w
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing roster csv: {e}"))?;
    write_atomic(path, &bytes)
}

/// Rendu texte compact : une ligne d'état puis une ligne par plage.
pub fn render_roster(response: &ProposalResponse) -> String {
    let solver = &response.solver;
    let mut out = String::new();
    let objective = solver
        .objective_value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    let _ = writeln!(
        out,
        "status={} objective={} spans={}",
        solver.status,
        objective,
        response.roster.len()
    );
    for a in &response.roster {
        let quiet = if a.quiet_bounds.is_empty() {
            String::new()
        } else {
            let ranges: Vec<String> = a.quiet_bounds.iter().map(|q| q.to_string()).collect();
            format!(" quiet={}", ranges.join(","))
        };
        let _ = writeln!(
            out,
            "{} x{} | {} → {} | {} slot(s){}",
            a.role,
            a.headcount,
            a.start.to_rfc3339(),
            a.end.to_rfc3339(),
            a.slot_count,
            quiet
        );
    }
    for u in &solver.unmet_constraints {
        let _ = writeln!(out, "unmet {} ({}): {}", u.role, u.kind, u.detail);
    }
    out
}
