/// SQL-schema för Radtrack
/// Logg- och anteckningstabellerna har spanska kolumnnamn (estado_*, fecha_*)

pub const SCHEMA_VERSION: i32 = 1;

pub const CREATE_TABLES: &str = r#"
-- Användare (kunder och intern personal)
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE CHECK (username <> ''),
    first_name TEXT,
    last_name TEXT,
    email TEXT,
    is_staff INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    PRIMARY KEY (user_id, role),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Processer
CREATE TABLE IF NOT EXISTS processes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    process_type TEXT NOT NULL DEFAULT 'otro',
    practice_category TEXT,
    estado TEXT NOT NULL DEFAULT 'en_progreso',
    fecha_inicio TEXT NOT NULL,
    fecha_final TEXT,
    fecha_asignacion TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_processes_user ON processes(user_id);

CREATE TABLE IF NOT EXISTS process_assignments (
    process_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    PRIMARY KEY (process_id, user_id),
    FOREIGN KEY (process_id) REFERENCES processes(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Checklistdefinitioner
CREATE TABLE IF NOT EXISTS checklist_item_definitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_type TEXT NOT NULL,
    practice_category TEXT,
    name TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    percentage TEXT NOT NULL DEFAULT '0'
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_definitions_unique
    ON checklist_item_definitions(process_type, COALESCE(practice_category, ''), name);

-- Processpecifika checklistpunkter
CREATE TABLE IF NOT EXISTS process_checklist_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    process_id INTEGER NOT NULL,
    definition_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pendiente',
    started_at TEXT,
    completed_at TEXT,
    completed_by INTEGER,
    FOREIGN KEY (process_id) REFERENCES processes(id) ON DELETE CASCADE,
    FOREIGN KEY (definition_id) REFERENCES checklist_item_definitions(id) ON DELETE RESTRICT,
    FOREIGN KEY (completed_by) REFERENCES users(id) ON DELETE SET NULL,
    UNIQUE (process_id, definition_id)
);

CREATE INDEX IF NOT EXISTS idx_checklist_items_process ON process_checklist_items(process_id);

-- Statushistorik
CREATE TABLE IF NOT EXISTS process_status_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    proceso_id INTEGER NOT NULL,
    estado_anterior TEXT,
    estado_nuevo TEXT NOT NULL,
    usuario_modifico INTEGER,
    fecha_cambio TEXT NOT NULL,
    FOREIGN KEY (proceso_id) REFERENCES processes(id) ON DELETE CASCADE,
    FOREIGN KEY (usuario_modifico) REFERENCES users(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_status_logs_process
    ON process_status_logs(proceso_id, fecha_cambio);

CREATE TABLE IF NOT EXISTS checklist_item_status_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL,
    estado_anterior TEXT,
    estado_nuevo TEXT NOT NULL,
    usuario_modifico INTEGER,
    fecha_cambio TEXT NOT NULL,
    FOREIGN KEY (item_id) REFERENCES process_checklist_items(id) ON DELETE CASCADE,
    FOREIGN KEY (usuario_modifico) REFERENCES users(id) ON DELETE SET NULL
);

-- Anteckningar
CREATE TABLE IF NOT EXISTS anotaciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    proceso_id INTEGER NOT NULL,
    usuario INTEGER,
    contenido TEXT NOT NULL,
    fecha_creacion TEXT NOT NULL,
    FOREIGN KEY (proceso_id) REFERENCES processes(id) ON DELETE CASCADE,
    FOREIGN KEY (usuario) REFERENCES users(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_anotaciones_process ON anotaciones(proceso_id);

-- Utrustningstyper
CREATE TABLE IF NOT EXISTS equipment_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE CHECK (name <> '')
);

-- Utrustning. En process med utrustning kan inte tas bort.
CREATE TABLE IF NOT EXISTS equipment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    equipment_type_id INTEGER,
    nombre TEXT NOT NULL DEFAULT '',
    marca TEXT,
    modelo TEXT,
    serial TEXT UNIQUE,
    user_id INTEGER,
    process_id INTEGER,
    sede TEXT,
    estado_actual TEXT NOT NULL DEFAULT 'en_uso',
    fecha_adquisicion TEXT,
    fecha_vigencia_licencia TEXT,
    fecha_ultimo_control_calidad TEXT,
    fecha_vencimiento_control_calidad TEXT,
    FOREIGN KEY (equipment_type_id) REFERENCES equipment_types(id) ON DELETE SET NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL,
    FOREIGN KEY (process_id) REFERENCES processes(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_equipment_process ON equipment(process_id);
CREATE INDEX IF NOT EXISTS idx_equipment_user ON equipment(user_id);

-- Historik över röntgenrör per utrustning
CREATE TABLE IF NOT EXISTS xray_tube_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    equipment_id INTEGER NOT NULL,
    marca TEXT,
    modelo TEXT,
    serial TEXT,
    fecha_cambio TEXT NOT NULL,
    FOREIGN KEY (equipment_id) REFERENCES equipment(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_xray_tubes_equipment ON xray_tube_history(equipment_id, fecha_cambio);

-- Rapporter. En process med rapporter kan inte tas bort.
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    process_id INTEGER,
    title TEXT NOT NULL,
    description TEXT,
    pdf_file TEXT,
    estado_reporte TEXT NOT NULL DEFAULT 'en_generacion',
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (process_id) REFERENCES processes(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_reports_process ON reports(process_id);

-- Migrationshistorik
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// (process_type, practice_category, [(namn, procent)])
pub type DefinitionGroup = (&'static str, Option<&'static str>, &'static [(&'static str, u32)]);

/// Standarddefinitioner att skapa vid första start. Varje grupp summerar till 100.
pub const DEFAULT_CHECKLIST_DEFINITIONS: &[DefinitionGroup] = &[
    (
        "calculo_blindajes",
        None,
        &[
            ("Elaboración de cálculo.", 30),
            ("Elaboración de informe.", 30),
            ("Revisión de informe.", 20),
            ("Publicación de informe.", 20),
        ],
    ),
    (
        "control_calidad",
        None,
        &[
            ("Realización de medidas.", 30),
            ("Elaboración de informe.", 30),
            ("Revisión de informe.", 20),
            ("Publicación de informe", 20),
        ],
    ),
    (
        "asesoria",
        Some("medica_cat1"),
        &[
            ("ANEXO 3 SOLICITUD DE REGISTRO.", 7),
            ("CEDULA SOLICITANTE Y RUT", 7),
            ("CERTIFICADO REPRESENTANTE LEGAL", 7),
            ("DOCUMENTOS OPR (acta de grado)", 7),
            ("CÁLCULO DE BLINDAJE", 6),
            ("CONTROL DE CALIDAD", 6),
            ("REPORTE DE DOSIMETRÍA.", 6),
            ("NIVELES DE REFERENCIA (anexo)", 6),
            ("PLANO DE LA INSTALACIÓN", 6),
            ("CURSOS DE PROTECCIÓN RADIOLÓGICA DEL PERSONAL.(actas de grado)", 6),
            ("PROGRAMA DE CAPACITACIÓN (anexo asistencia)", 6),
            ("HOJA DE VIDA EQUIPOS - REGISTROS DE MANTENIMIENTO DEL EQUIPO - INVIMA", 6),
            ("FORMATO DE PUESTA EN MARCHA (SI EL EQUIPO ES NUEVO)", 6),
            ("MANUAL DE TECNOVIGILANCIA (anexo foreia)", 6),
            ("MANUAL DE PROTECCIÓN RADIOLÓGICA anexo(incidentes -accidentes)", 6),
            ("LICENCIA ANTERIOR DEL EQUIPO (no si el equipo es nuevo)", 6),
        ],
    ),
    (
        "asesoria",
        Some("medica_cat2"),
        &[
            ("ANEXO 3 SOLICITUD DE REGISTRO.", 6),
            ("CÁMARA DE COMERCIO Y RUT", 6),
            ("CEDULA REPRESENTANTE LEGAL", 6),
            ("DOCUMENTOS OPR (actas de grado)", 6),
            ("CÁLCULO DE BLINDAJE.", 6),
            ("CONTROL DE CALIDAD.", 5),
            ("REPORTE DE DOSIMETRÍA", 5),
            ("PLANO DE LA INSTALACIÓN", 5),
            ("CURSOS DE PROTECCIÓN RADIOLÓGICA DEL PERSONAL.", 5),
            ("PROGRAMA DE CAPACITACIÓN", 5),
            ("NIVELES DE REFERENCIA", 5),
            ("DESCRIPCIÓN SISTEMAS DE SEGURIDAD", 5),
            ("HOJA DE VIDA EQUIPOS - REGISTROS DE MANTENIMIENTO DEL EQUIPO - INVIMA – PERMISO DE IMPORTACIÓN", 5),
            ("1 FORMATO DE PUESTA EN MARCHA (SI EL EQUIPO ES NUEVO).", 5),
            ("MANUAL DE PROTECCIÓN RADIOLÓGICA", 5),
            ("MANUAL DE TECNOVIGILANCIA", 5),
            ("LICENCIA ANTERIOR DEL EQUIPO (no si el equipo es nuevo) REGISTRO", 5),
            ("EVALUACIÓN DE PUESTO DE TRABAJO", 5),
            ("ACEPTACIÓN DE RESPONSABILIDADES OPR", 5),
        ],
    ),
    (
        "asesoria",
        Some("veterinaria"),
        &[
            ("CARTA SOLICITUD DE LICENCIA (Bogotá no)", 6),
            ("ANEXO 4", 6),
            ("RUT", 6),
            ("CÉDULA Y DIPLOMAS EPR", 6),
            ("PROGRAMA DE PROTECCIÓN RADIOLÓGICA", 6),
            ("ESTUDIO AMBIENTAL", 6),
            ("ESTUDIO MEDIO AMBIENTAL", 6),
            ("CÁLCULO DE BLINDAJES", 6),
            ("PROGRAMA DE VIGILANCIA POST MERCADO", 6),
            ("CERTIFICADO DE CURSO DE PROTECCIÓN RADIOLÓGICA TOES", 6),
            ("CONSTANCIA ASISTENCIA A CURSO SOBRE MANEJO DE EQUIPOS RX", 6),
            ("PROGRAMA DE CAPACITACIÓN EN PROTECCIÓN RADIOLÓGICA", 6),
            ("CERTIFICADO DE DOSIMETRÍA", 6),
            ("EVALUACIÓN DE EMERGENCIAS. (NO APLICA PARA INDUSTRIALES CAT I)", 6),
            ("HOJA DE VIDA DEL EQUIPO/MANTENIMIENTO/FICHA TECNICA/MANUAL DE USUARIO", 6),
            ("LICENCIA ANTERIOR/PUESTA EN MARCHA O PRUEBAS INICIALES", 5),
            ("PLANO GENERAL", 5),
        ],
    ),
];

/// Utrustningstyper att skapa vid första start
pub const DEFAULT_EQUIPMENT_TYPES: &[&str] = &[
    "RX CONVENCIONAL",
    "RX CONVENCIONAL PORTATIL",
    "RX PERIAPICAL",
    "RX PERIAPICAL PORTATIL",
    "RX VETERINARIO",
    "RX INDUSTRIAL",
    "TOMOGRAFÍA COMPUTARIZADA",
    "TOMOGRAFÍA DENTAL",
    "PANORÁMICO CEFÁLICO",
    "ANGIÓGRAFO",
    "MAMÓGRAFO",
    "DENSITOMETRO",
    "ARCO EN C",
    "FLUOROSCOPIO",
];
