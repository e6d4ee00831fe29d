//! Backfills skills and offer categories on `empleo.ofertas_laborales`.
//!
//! Offers are scraped upstream; this step only derives structured fields
//! from the free-text title and description.

use log::info;
use regex::Regex;

use crate::errors::EtlError;
use crate::etl::report::{EtlReport, LoadOutcome};
use crate::etl::runner::EtlContext;

const BATCH_SIZE: usize = 500;

const SKILL_PATTERNS: &[(&str, &str)] = &[
    (r"\bexcel\b", "Excel"),
    (r"\bword\b", "Word"),
    (r"\bsap\b", "SAP"),
    (r"\bpython\b", "Python"),
    (r"\bsql\b", "SQL"),
    (r"\bingl[eé]s\b", "Inglés"),
    (r"\bcontabilidad\b", "Contabilidad"),
    (r"\bfacturaci[oó]n\b", "Facturación"),
    (r"\batenci[oó]n al cliente\b", "Atención al cliente"),
    (r"\bservicio al cliente\b", "Servicio al cliente"),
    (r"\bventas\b", "Ventas"),
    (r"\bliderazgo\b", "Liderazgo"),
    (r"\btrabajo en equipo\b", "Trabajo en equipo"),
    (r"\bcomunicaci[oó]n\b", "Comunicación"),
    (r"\bnegociaci[oó]n\b", "Negociación"),
    (r"\bmanejo de personal\b", "Manejo de personal"),
    (r"\blogística\b|\blogistica\b", "Logística"),
    (r"\bpresupuesto\b", "Presupuesto"),
    (r"\bmarketing\b|\bmercadeo\b", "Marketing"),
    (r"\bredes sociales\b|\bsocial media\b", "Redes sociales"),
    (r"\blicencia\s+(de\s+)?conducci[oó]n\b|\blicencia\s+[bc]\d\b", "Licencia de conducción"),
    (r"\bmoto\b", "Moto propia"),
    (r"\bsalud ocupacional\b|\bsst\b|\bseguridad y salud\b", "SST"),
    (r"\bagricultura\b|\bagrícola\b|\bagricola\b|\bcultivo\b", "Agricultura"),
    (r"\bbanano\b|\bplátano\b|\bplatano\b", "Cultivo banano/plátano"),
    (r"\bglobalg\.?a\.?p\.?\b|\brainforest\b", "Certificaciones agrícolas"),
    (r"\benfermería\b|\benfermeria\b|\benfermero\b", "Enfermería"),
    (r"\bmedicina\b|\bmédico\b|\bmedico\b", "Medicina"),
    (r"\bpedagog\b|\beducaci[oó]n\b|\bdocente\b|\bprofesor\b", "Educación"),
    (r"\bconstrucci[oó]n\b|\bobra\b|\bingeniería civil\b", "Construcción"),
    (r"\belectricidad\b|\beléctric\b|\belectric\b", "Electricidad"),
    (r"\bmecánic\b|\bmecanica\b", "Mecánica"),
    (r"\bsoldadura\b", "Soldadura"),
    // herramientas y software
    (r"\bpower\s*bi\b", "Power BI"),
    (r"\btableau\b", "Tableau"),
    (r"\berp\b", "ERP"),
    (r"\bcrm\b", "CRM"),
    (r"\bautocad\b|\bauto\s*cad\b", "AutoCAD"),
    (r"\bphotoshop\b|\billustrator\b|\bdise[nñ]o\b", "Diseno grafico"),
    (r"\bsiigo\b|\bworld\s*office\b|\bhelisa\b", "Software contable"),
    // gestión
    (r"\bplaneaci[oó]n\b|\bplanificaci[oó]n\b", "Planeacion"),
    (r"\bgesti[oó]n\b", "Gestion"),
    (r"\binventario\b", "Inventarios"),
    (r"\bcaja\b|\bmanejo.*efectivo\b", "Manejo de caja"),
    (r"\bcobranza\b|\bcartera\b", "Cobranza/Cartera"),
    (r"\bimportaci[oó]n\b|\bexportaci[oó]n\b|\bcomercio\s+exterior\b", "Comercio exterior"),
    (r"\bcalidad\b|\biso\b|\bnormas?\b", "Gestion de calidad"),
    (r"\bprimeros\s+auxilios\b|\bbrigad\b", "Primeros auxilios"),
    // agro Urabá
    (r"\bfitosanitar\b|\bplagas?\b|\bfumig\b", "Fitosanidad"),
    (r"\bempaque\b|\bembalaje\b|\bempacad\b", "Empaque"),
    (r"\bcosecha\b|\brecolec\b|\bcorte\b.*\bbanano\b", "Cosecha"),
    (r"\briego\b|\bdrenaje\b|\bfertirriego\b", "Riego y drenaje"),
    (r"\bcertific\b.*\borganic\b|\bglobal\s*gap\b", "Certificacion organica"),
    // transporte y operaciones
    (r"\bmontacarga\b", "Montacargas"),
    (r"\bveh[ií]culo\s+propio\b", "Vehiculo propio"),
    (r"\bcadena\s+de\s+fr[ií]o\b", "Cadena de frio"),
    (r"\bBPM\b|\bbuenas\s+pr[aá]cticas\b", "BPM"),
    (r"\bHACCP\b", "HACCP"),
];

const EXPERIENCIA_PATTERNS: &[(&str, &str)] = &[
    (r"sin\s+experiencia|no\s+requiere\s+experiencia|primera\s+vez", "Sin experiencia"),
    (r"1\s*a[nñ]o|12\s*meses|un\s*\(?\d?\)?\s*a[nñ]o", "1 ano"),
    (r"2\s*a[nñ]os?|24\s*meses", "2 anos"),
    (r"3\s*a[nñ]os?|36\s*meses", "3 anos"),
    (r"[45]\s*a[nñ]os?", "4-5 anos"),
    (r"[6-9]\s*a[nñ]os?|\d{2,}\s*a[nñ]os?|m[aá]s\s+de\s+5", "5+ anos"),
];

const CONTRATO_PATTERNS: &[(&str, &str)] = &[
    (r"indefinido|fijo\s+indefinido|planta", "Indefinido"),
    (r"fijo|t[eé]rmino\s+fijo|temporal", "Fijo"),
    (r"prestaci[oó]n\s+de\s+servicios|contratista|independiente|freelance", "Prestacion de servicios"),
    (r"obra\s+o?\s*labor|obra\s+civil|por\s+obra", "Obra o labor"),
    (r"aprendiz|sena|practicante|pr[aá]ctica", "Aprendizaje"),
];

const EDUCACION_PATTERNS: &[(&str, &str)] = &[
    (r"bachiller|secundaria|11[°º]", "Bachiller"),
    (r"t[eé]cnic[oa]", "Tecnico"),
    (r"tecn[oó]log[oa]", "Tecnologo"),
    (r"profesional|universitari[oa]|ingenier[oa]|abogad[oa]|licenciad[oa]", "Profesional"),
    (r"especializaci[oó]n|especialista|postgrado|posgrado", "Especializacion"),
    (r"maestr[ií]a|magister|m[aá]ster", "Maestria"),
];

const MODALIDAD_PATTERNS: &[(&str, &str)] = &[
    (r"remoto|teletrabajo|home\s*office|desde\s+casa|virtual", "Remoto"),
    (r"h[ií]brido|mixto|alterno", "Hibrido"),
    (r"presencial|en\s+sitio|campo|planta", "Presencial"),
];

pub const ENRICHMENT_COLUMNS: [&str; 4] = ["nivel_experiencia", "tipo_contrato", "nivel_educativo", "modalidad"];

struct PatternSet(Vec<(Regex, &'static str)>);

impl PatternSet {
    fn compile(patterns: &[(&str, &'static str)]) -> Result<Self, regex::Error> {
        let compiled = patterns
            .iter()
            .map(|(pattern, label)| Regex::new(&format!("(?i){}", pattern)).map(|re| (re, *label)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PatternSet(compiled))
    }

    fn all(&self, text: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, label)| label.to_string())
            .collect()
    }

    fn first(&self, text: &str) -> Option<&'static str> {
        self.0.iter().find(|(re, _)| re.is_match(text)).map(|(_, label)| *label)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enrichment {
    pub skills: Vec<String>,
    pub nivel_experiencia: Option<&'static str>,
    pub tipo_contrato: Option<&'static str>,
    pub nivel_educativo: Option<&'static str>,
    pub modalidad: Option<&'static str>,
}

pub struct Enricher {
    skills: PatternSet,
    experiencia: PatternSet,
    contrato: PatternSet,
    educacion: PatternSet,
    modalidad: PatternSet,
}

impl Enricher {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Enricher {
            skills: PatternSet::compile(SKILL_PATTERNS)?,
            experiencia: PatternSet::compile(EXPERIENCIA_PATTERNS)?,
            contrato: PatternSet::compile(CONTRATO_PATTERNS)?,
            educacion: PatternSet::compile(EDUCACION_PATTERNS)?,
            modalidad: PatternSet::compile(MODALIDAD_PATTERNS)?,
        })
    }

    pub fn enrich(&self, titulo: Option<&str>, descripcion: Option<&str>) -> Enrichment {
        let text = format!("{} {}", titulo.unwrap_or_default(), descripcion.unwrap_or_default()).to_lowercase();
        Enrichment {
            skills: self.skills.all(&text),
            nivel_experiencia: self.experiencia.first(&text),
            tipo_contrato: self.contrato.first(&text),
            nivel_educativo: self.educacion.first(&text),
            modalidad: self.modalidad.first(&text),
        }
    }
}

pub async fn run(ctx: &EtlContext, report: &mut EtlReport) {
    report.record("empleo_enriquecimiento", backfill(ctx).await);
}

async fn backfill(ctx: &EtlContext) -> Result<LoadOutcome, EtlError> {
    let enricher = Enricher::new()?;

    sqlx::query("ALTER TABLE empleo.ofertas_laborales ADD COLUMN IF NOT EXISTS skills TEXT[]")
        .execute(&ctx.pool)
        .await?;
    for column in ENRICHMENT_COLUMNS {
        let sql = format!("ALTER TABLE empleo.ofertas_laborales ADD COLUMN IF NOT EXISTS {} TEXT", column);
        sqlx::query(&sql).execute(&ctx.pool).await?;
    }

    let offers: Vec<(i64, Option<String>, Option<String>)> =
        sqlx::query_as("SELECT id::bigint, titulo, descripcion FROM empleo.ofertas_laborales ORDER BY id")
            .fetch_all(&ctx.pool)
            .await?;
    info!("ofertas a procesar: {}", offers.len());

    let mut updated = 0u64;
    for batch in offers.chunks(BATCH_SIZE) {
        let mut tx = ctx.pool.begin().await?;
        for (id, titulo, descripcion) in batch {
            let e = enricher.enrich(titulo.as_deref(), descripcion.as_deref());
            sqlx::query(
                "UPDATE empleo.ofertas_laborales \
                 SET skills = $1, nivel_experiencia = $2, tipo_contrato = $3, nivel_educativo = $4, modalidad = $5 \
                 WHERE id = $6",
            )
            .bind(&e.skills)
            .bind(e.nivel_experiencia)
            .bind(e.tipo_contrato)
            .bind(e.nivel_educativo)
            .bind(e.modalidad)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        updated += batch.len() as u64;
        info!("actualizadas: {}/{}", updated, offers.len());
    }

    Ok(LoadOutcome::rows(updated))
}
