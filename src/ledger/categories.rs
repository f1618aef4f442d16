//! Fixed category and payment-method enumerations for both ledger sides.
//!
//! Values mirror the dropdowns of the spreadsheet. Validation failures
//! return the full list so the model can retry with a valid value.

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Alimentación (comestibles, restaurantes)",
    "Cuidado personal (peluquería, productos de belleza)",
    "Deudas (tarjetas de crédito, préstamos)",
    "Educación (cursos, libros, matrículas)",
    "Emprendimiento",
    "Entretenimiento (cine, conciertos, salidas)",
    "Farmacia",
    "Gimnasio",
    "Hueso",
    "Impuestos",
    "Mascotas (alimentación, cuidado veterinario)",
    "Regalos y donaciones",
    "Ropa y accesorios",
    "Salud (seguro médico, consultas médicas, medicamentos)",
    "Tecnología (dispositivos electrónicos, servicios de internet)",
    "Transporte (gasolina, transporte público, mantenimiento del vehículo)",
    "Varios",
    "Viajes",
    "Vivienda (alquiler/hipoteca, servicios públicos, mantenimiento)",
];

pub const EXPENSE_PAYMENT_METHODS: &[&str] = &[
    "Cripto",
    "Efectivo",
    "Otros",
    "QR",
    "Tarjeta de crédito",
    "Tarjeta de débito",
    "Transferencia",
];

pub const INCOME_CATEGORIES: &[&str] = &[
    "Bonificaciones",
    "Emprendimiento",
    "Freelance / Trabajos temporales",
    "Ingresos adicionales (cualquier otro tipo de ingreso no cubierto por las categorías anteriores)",
    "Ingresos de inversiones",
    "Reembolsos",
    "Salario",
];

pub const INCOME_PAYMENT_METHODS: &[&str] = &[
    "Efectivo",
    "Otros",
    "Tarjeta de débito",
    "Transferencia",
];

/// Validate an expense category/payment-method pair.
pub fn validate_expense(category: &str, payment_method: &str) -> Result<(), String> {
    if !EXPENSE_CATEGORIES.contains(&category) {
        return Err(format!(
            "Categoría '{}' no válida. Usa: {}",
            category,
            EXPENSE_CATEGORIES.join(", ")
        ));
    }
    if !EXPENSE_PAYMENT_METHODS.contains(&payment_method) {
        return Err(format!(
            "Método '{}' no válido. Usa: {}",
            payment_method,
            EXPENSE_PAYMENT_METHODS.join(", ")
        ));
    }
    Ok(())
}

/// Validate an income category/payment-method pair.
pub fn validate_income(category: &str, payment_method: &str) -> Result<(), String> {
    if !INCOME_CATEGORIES.contains(&category) {
        return Err(format!(
            "Categoría '{}' no válida. Usa: {}",
            category,
            INCOME_CATEGORIES.join(", ")
        ));
    }
    if !INCOME_PAYMENT_METHODS.contains(&payment_method) {
        return Err(format!(
            "Método '{}' no válido. Usa: {}",
            payment_method,
            INCOME_PAYMENT_METHODS.join(", ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_expense() {
        assert!(validate_expense("Farmacia", "Efectivo").is_ok());
        assert!(validate_expense("Varios", "QR").is_ok());
    }

    #[test]
    fn test_invalid_expense_category() {
        let err = validate_expense("Comida", "Efectivo").unwrap_err();
        assert!(err.contains("Categoría 'Comida' no válida"));
        // Error lists the valid values for the model to retry with
        assert!(err.contains("Farmacia"));
    }

    #[test]
    fn test_invalid_expense_payment_method() {
        let err = validate_expense("Farmacia", "Cheque").unwrap_err();
        assert!(err.contains("Método 'Cheque' no válido"));
        assert!(err.contains("Transferencia"));
    }

    #[test]
    fn test_valid_income() {
        assert!(validate_income("Salario", "Transferencia").is_ok());
    }

    #[test]
    fn test_income_rejects_expense_only_method() {
        // QR and Cripto exist only on the expense side
        assert!(validate_income("Salario", "QR").is_err());
        assert!(validate_income("Salario", "Cripto").is_err());
    }

    #[test]
    fn test_category_match_is_exact() {
        assert!(validate_expense("farmacia", "Efectivo").is_err());
    }
}
